use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, channel};

use crate::config::{ForecastConfig, ScalePolicy};
use crate::data::{ParsedSeries, SeriesFormat, ValidationError, load_series_file, parse_series};
use crate::engine::{
    JobEvent, MIN_TRAINING_POINTS, OrchestrationError, PredictorFactory, TrainingOrchestrator,
};
use crate::models::Forecast;

/// One user's working state: the current dataset and the orchestrator that trains on it.
pub struct Session {
    scale_policy: ScalePolicy,
    dataset: Option<Arc<ParsedSeries>>,
    orchestrator: Arc<TrainingOrchestrator>,
}

impl Session {
    /// Returns the session and the receiving end of its job events.
    pub fn new(
        config: ForecastConfig,
        factory: Arc<dyn PredictorFactory>,
    ) -> Result<(Self, Receiver<JobEvent>), OrchestrationError> {
        let (events_tx, events_rx) = channel();
        let orchestrator = TrainingOrchestrator::new(config, factory, events_tx)?;
        let session = Self {
            scale_policy: config.scale,
            dataset: None,
            orchestrator: Arc::new(orchestrator),
        };
        Ok((session, events_rx))
    }

    /// Replaces the dataset. A rejected upload leaves the session without one.
    pub fn upload(
        &mut self,
        raw: &[u8],
        format: SeriesFormat,
    ) -> Result<&ParsedSeries, ValidationError> {
        self.dataset = None;
        let parsed = parse_series(raw, format, self.scale_policy)?;
        Ok(self.install(parsed))
    }

    pub async fn load_file(
        &mut self,
        path: &Path,
        format: Option<SeriesFormat>,
    ) -> Result<&ParsedSeries> {
        self.dataset = None;
        let parsed = load_series_file(path, format, self.scale_policy).await?;
        Ok(self.install(parsed))
    }

    fn install(&mut self, parsed: ParsedSeries) -> &ParsedSeries {
        log::info!(
            "Session: dataset installed ({} points, {} skipped lines, scale {})",
            parsed.series.len(),
            parsed.warnings.len(),
            parsed.scale
        );
        self.dataset.insert(Arc::new(parsed))
    }

    pub fn dataset(&self) -> Option<&ParsedSeries> {
        self.dataset.as_deref()
    }

    pub fn orchestrator(&self) -> &Arc<TrainingOrchestrator> {
        &self.orchestrator
    }

    /// Start controls should be enabled only when this is true.
    pub fn can_train(&self) -> bool {
        self.dataset.is_some() && self.orchestrator.phase().is_idle()
    }

    /// Trains on a snapshot of the current dataset and forecasts the next day.
    pub async fn train(&self) -> Result<Forecast, OrchestrationError> {
        let dataset = self
            .dataset
            .clone()
            .ok_or(OrchestrationError::NoDataset)?;

        self.orchestrator.ensure_engine().await?;
        let prediction = self
            .orchestrator
            .run(&dataset.series, dataset.scale)
            .await?;

        let last_point = dataset
            .series
            .last()
            .copied()
            .ok_or(OrchestrationError::InsufficientData {
                found: 0,
                required: MIN_TRAINING_POINTS,
            })?;
        Ok(Forecast::new(prediction, last_point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FORECAST, OrchestratorConfig};
    use crate::domain::Trend;
    use crate::engine::RegressorFactory;
    use chrono::{Days, NaiveDate};

    fn csv(rows: usize) -> String {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut text = String::from("date,open,high,low,close\n");
        for i in 0..rows {
            let base = 50.0 + (i % 7) as f64;
            text.push_str(&format!(
                "{},{},{},{},{}\n",
                start + Days::new(i as u64),
                base,
                base + 3.0,
                base - 3.0,
                base + 1.0
            ));
        }
        text
    }

    fn session() -> (Session, Receiver<JobEvent>) {
        let config = ForecastConfig {
            orchestrator: OrchestratorConfig::IMMEDIATE,
            ..FORECAST
        };
        Session::new(config, Arc::new(RegressorFactory::inline())).unwrap()
    }

    #[tokio::test]
    async fn training_needs_a_dataset() {
        let (session, rx) = session();
        assert!(!session.can_train());
        assert_eq!(
            session.train().await.unwrap_err(),
            OrchestrationError::NoDataset
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rejected_upload_discards_the_previous_dataset() {
        let (mut session, _rx) = session();
        session.upload(csv(60).as_bytes(), SeriesFormat::Csv).unwrap();
        assert!(session.can_train());

        let err = session
            .upload(csv(10).as_bytes(), SeriesFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientData { found: 10, .. }));
        assert!(session.dataset().is_none());
        assert!(!session.can_train());
    }

    #[tokio::test]
    async fn trains_and_forecasts_the_next_day() {
        let (mut session, rx) = session();
        let dataset = session.upload(csv(60).as_bytes(), SeriesFormat::Csv).unwrap();
        assert_eq!(dataset.series.len(), 60);
        let last = *dataset.series.last().unwrap();

        let forecast = session.train().await.unwrap();
        assert_eq!(forecast.last_point, last);
        assert_eq!(forecast.target_date, last.date.succ_opt());
        let expected = if forecast.prediction.close > last.close {
            Trend::Up
        } else {
            Trend::Down
        };
        assert_eq!(forecast.trend, expected);

        let events: Vec<JobEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(JobEvent::Started { .. })));
        assert!(events.iter().any(|e| matches!(e, JobEvent::Progress(_))));
        assert_eq!(events.last(), Some(&JobEvent::Reset));
        assert!(session.can_train());
    }
}
