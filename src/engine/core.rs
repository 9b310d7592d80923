use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::ForecastConfig;
use crate::domain::{ScaleFactor, Series};
use crate::models::{Prediction, TrainingSequence, build_sequences};

use super::error::{OrchestrationError, TrainingError};
use super::messages::{JobEvent, TrainingProgress};
use super::predictor::{EngineStatus, PredictorFactory, SequencePredictor};
use super::state::{JobPhase, PhaseGuard, read_phase};

/// A series shorter than this is refused before any job starts.
pub const MIN_TRAINING_POINTS: usize = 5;

/// Runs one training job at a time against the session's predictor.
///
/// Every job that reaches training emits, in order: `Started`, zero or more
/// `Progress`, exactly one of `Succeeded` / `Failed`, then `Reset`. A job whose
/// series yields no windows emits only `Failed` and `Reset`. Requests refused up
/// front (engine not ready, series too short, job already running) return an
/// error and emit nothing.
pub struct TrainingOrchestrator {
    config: ForecastConfig,
    factory: Arc<dyn PredictorFactory>,

    /// Held for the whole job, so a locked slot means a job is in flight.
    predictor: tokio::sync::Mutex<Option<Box<dyn SequencePredictor>>>,
    phase: Mutex<JobPhase>,
    events: Sender<JobEvent>,
}

impl TrainingOrchestrator {
    pub fn new(
        config: ForecastConfig,
        factory: Arc<dyn PredictorFactory>,
        events: Sender<JobEvent>,
    ) -> Result<Self, OrchestrationError> {
        config.validate().map_err(OrchestrationError::InvalidConfig)?;
        Ok(Self {
            config,
            factory,
            predictor: tokio::sync::Mutex::new(None),
            phase: Mutex::new(JobPhase::Idle),
            events,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn phase(&self) -> JobPhase {
        read_phase(&self.phase)
    }

    /// True once a predictor is installed. A busy slot means a job holds it.
    pub fn engine_ready(&self) -> bool {
        match self.predictor.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(_) => true,
        }
    }

    /// Brings up the predictor if it is not there yet, polling the factory
    /// with the configured bounded retry.
    pub async fn ensure_engine(&self) -> Result<(), OrchestrationError> {
        let mut slot = self
            .predictor
            .try_lock()
            .map_err(|_| OrchestrationError::AlreadyRunning)?;
        if slot.is_some() {
            return Ok(());
        }

        let policy = self.config.orchestrator.engine_init;
        for attempt in 1..=policy.max_attempts {
            match self.factory.try_create() {
                EngineStatus::Ready(predictor) => {
                    log::info!(
                        "Engine: '{}' ready after {} attempt(s)",
                        predictor.name(),
                        attempt
                    );
                    *slot = Some(predictor);
                    return Ok(());
                }
                EngineStatus::Failed(e) => {
                    log::error!("Engine: initialisation failed: {}", e);
                    return Err(e.into());
                }
                EngineStatus::Pending => {
                    #[cfg(debug_assertions)]
                    if crate::config::DF.log_engine_init {
                        log::info!(
                            "Engine: not ready (attempt {}/{})",
                            attempt,
                            policy.max_attempts
                        );
                    }
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.delay()).await;
                    }
                }
            }
        }

        log::warn!(
            "Engine: still unavailable after {} attempts",
            policy.max_attempts
        );
        Err(OrchestrationError::EngineUnavailable {
            attempts: policy.max_attempts,
        })
    }

    /// Trains on `series` and predicts the step after its last window.
    pub async fn run(
        &self,
        series: &Series,
        scale: ScaleFactor,
    ) -> Result<Prediction, OrchestrationError> {
        let mut slot = self
            .predictor
            .try_lock()
            .map_err(|_| OrchestrationError::AlreadyRunning)?;
        let Some(predictor) = slot.as_mut() else {
            return Err(OrchestrationError::NotReady);
        };
        if series.len() < MIN_TRAINING_POINTS {
            return Err(OrchestrationError::InsufficientData {
                found: series.len(),
                required: MIN_TRAINING_POINTS,
            });
        }
        let guard = PhaseGuard::begin(&self.phase, &self.events)
            .ok_or(OrchestrationError::AlreadyRunning)?;

        match self.execute(predictor, series, scale).await {
            Ok(prediction) => {
                log::info!(
                    "Training: predicted O {:.4} H {:.4} L {:.4} C {:.4}",
                    prediction.open,
                    prediction.high,
                    prediction.low,
                    prediction.close
                );
                guard.set(JobPhase::Succeeded);
                self.emit(JobEvent::Succeeded(prediction));
                self.hold(self.config.orchestrator.success_reset_delay())
                    .await;
                Ok(prediction)
            }
            Err(e) => {
                log::error!("Training: job failed: {}", e);
                guard.set(JobPhase::Failed);
                self.emit(JobEvent::Failed(e.to_string()));
                self.hold(self.config.orchestrator.failure_reset_delay())
                    .await;
                Err(e)
            }
        }
        // `guard` drops here: phase back to Idle, Reset emitted.
    }

    async fn execute(
        &self,
        predictor: &mut Box<dyn SequencePredictor>,
        series: &Series,
        scale: ScaleFactor,
    ) -> Result<Prediction, OrchestrationError> {
        let window = self.config.window;
        let sequences: Arc<[TrainingSequence]> = crate::trace_time!("Build sequences", 5_000, {
            build_sequences(series, scale, &window).into()
        });

        log::info!(
            "Training: {} sequences (window {}, stride {}, scale {}) on '{}'",
            sequences.len(),
            window.length,
            window.stride,
            scale,
            predictor.name()
        );
        let Some(last) = sequences.last().cloned() else {
            return Err(OrchestrationError::NoSequences {
                points: series.len(),
                window: window.length,
            });
        };
        self.emit(JobEvent::Started {
            sequences: sequences.len(),
        });

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<TrainingProgress>();
        let training = predictor.train(Arc::clone(&sequences), self.config.training, progress_tx);
        let forwarding = async {
            // Ends once the predictor drops its sender, so all progress precedes the outcome.
            while let Some(p) = progress_rx.recv().await {
                #[cfg(debug_assertions)]
                if crate::config::DF.log_progress {
                    log::debug!(
                        "Training: iteration {} error {:.6} ({:.0}%)",
                        p.iteration,
                        p.error,
                        p.percent()
                    );
                }
                self.emit(JobEvent::Progress(p));
            }
        };
        let (summary, ()) = tokio::join!(training, forwarding);
        let summary = summary?;

        log::info!(
            "Training: {} after {} iterations (error {:.6})",
            if summary.converged { "converged" } else { "stopped" },
            summary.iterations,
            summary.error
        );

        let output = predictor.run(last).await?;
        if !output.is_finite() {
            return Err(TrainingError::new("predictor returned a non-finite value").into());
        }
        Ok(Prediction::denormalize(output, scale))
    }

    fn emit(&self, event: JobEvent) {
        // A closed receiver just means nobody is listening any more.
        let _ = self.events.send(event);
    }

    async fn hold(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FORECAST, OrchestratorConfig};
    use crate::domain::OhlcPoint;
    use crate::engine::TrainingSummary;
    use crate::engine::ProgressSender;
    use crate::models::NormalizedPoint;
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc::{Receiver, channel};
    use tokio::sync::Notify;

    /// Replays a fixed script: progress reports, then a training result, then a prediction.
    #[derive(Clone)]
    struct ScriptedPredictor {
        progress: Vec<TrainingProgress>,
        train_error: Option<String>,
        output: NormalizedPoint,
        entered: Option<Arc<Notify>>,
        release: Option<Arc<Notify>>,
    }

    impl ScriptedPredictor {
        fn converging(output: NormalizedPoint) -> Self {
            Self {
                progress: vec![TrainingProgress::new(1, 0.0001, 2000)],
                train_error: None,
                output,
                entered: None,
                release: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                train_error: Some(message.to_string()),
                ..Self::converging(NormalizedPoint::default())
            }
        }
    }

    #[async_trait]
    impl SequencePredictor for ScriptedPredictor {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn train(
            &mut self,
            _sequences: Arc<[TrainingSequence]>,
            _config: crate::config::TrainingConfig,
            progress: ProgressSender,
        ) -> Result<TrainingSummary, TrainingError> {
            if let Some(entered) = &self.entered {
                entered.notify_one();
            }
            if let Some(release) = &self.release {
                release.notified().await;
            }
            for p in &self.progress {
                let _ = progress.send(*p);
            }
            match &self.train_error {
                Some(msg) => Err(TrainingError::new(msg.clone())),
                None => Ok(TrainingSummary {
                    iterations: self.progress.len(),
                    error: 0.0001,
                    converged: true,
                }),
            }
        }

        async fn run(&mut self, _sequence: TrainingSequence) -> Result<NormalizedPoint, TrainingError> {
            Ok(self.output)
        }
    }

    /// Reports `Pending` a number of times, then hands out the predictor.
    struct SlowFactory {
        pending: AtomicU32,
        predictor: ScriptedPredictor,
    }

    impl SlowFactory {
        fn new(pending: u32, predictor: ScriptedPredictor) -> Arc<Self> {
            Arc::new(Self {
                pending: AtomicU32::new(pending),
                predictor,
            })
        }
    }

    impl PredictorFactory for SlowFactory {
        fn try_create(&self) -> EngineStatus {
            let left = self.pending.load(Ordering::SeqCst);
            if left > 0 {
                self.pending.store(left - 1, Ordering::SeqCst);
                return EngineStatus::Pending;
            }
            EngineStatus::Ready(Box::new(self.predictor.clone()))
        }
    }

    struct BrokenFactory;

    impl PredictorFactory for BrokenFactory {
        fn try_create(&self) -> EngineStatus {
            EngineStatus::Failed(TrainingError::new("model weights missing"))
        }
    }

    fn series_of(n: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Series::from_points(
            (0..n)
                .map(|i| {
                    let base = 100.0 + i as f64;
                    OhlcPoint::new(
                        start.checked_add_days(Days::new(i as u64)).unwrap(),
                        base,
                        base + 2.0,
                        base - 2.0,
                        base + 1.0,
                    )
                })
                .collect(),
        )
    }

    fn immediate() -> ForecastConfig {
        ForecastConfig {
            orchestrator: OrchestratorConfig::IMMEDIATE,
            ..FORECAST
        }
    }

    fn orchestrator(
        config: ForecastConfig,
        factory: Arc<dyn PredictorFactory>,
    ) -> (TrainingOrchestrator, Receiver<JobEvent>) {
        let (tx, rx) = channel();
        (TrainingOrchestrator::new(config, factory, tx).unwrap(), rx)
    }

    fn scale() -> ScaleFactor {
        ScaleFactor::new(138.0).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = FORECAST;
        config.window.stride = 0;
        let (tx, _rx) = channel();
        let result = TrainingOrchestrator::new(config, SlowFactory::new(0, ScriptedPredictor::failing("x")), tx);
        assert!(matches!(result, Err(OrchestrationError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn refuses_to_run_before_the_engine_is_up() {
        let (orch, rx) = orchestrator(immediate(), SlowFactory::new(0, ScriptedPredictor::failing("x")));
        assert!(!orch.engine_ready());
        let err = orch.run(&series_of(60), scale()).await.unwrap_err();
        assert_eq!(err, OrchestrationError::NotReady);
        assert_eq!(orch.phase(), JobPhase::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn refuses_short_series_without_events() {
        let output = NormalizedPoint::new(0.5, 0.6, 0.4, 0.55);
        let (orch, rx) = orchestrator(immediate(), SlowFactory::new(0, ScriptedPredictor::converging(output)));
        orch.ensure_engine().await.unwrap();

        let err = orch.run(&series_of(4), scale()).await.unwrap_err();
        assert_eq!(
            err,
            OrchestrationError::InsufficientData {
                found: 4,
                required: 5
            }
        );
        assert_eq!(orch.phase(), JobPhase::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn successful_job_emits_the_full_sequence() {
        let output = NormalizedPoint::new(0.5, 0.6, 0.4, 0.55);
        let (orch, rx) = orchestrator(immediate(), SlowFactory::new(0, ScriptedPredictor::converging(output)));
        orch.ensure_engine().await.unwrap();

        let prediction = orch.run(&series_of(60), scale()).await.unwrap();
        let expected = Prediction {
            open: 69.0,
            high: 82.8,
            low: 55.2,
            close: 75.9,
        };
        assert!(prediction.approx_eq(&expected, 1e-9));
        assert_eq!(orch.phase(), JobPhase::Idle);

        let events: Vec<JobEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        // 60 points, recent limit 365, L = S = 5: windows start at 0..=50.
        assert_eq!(events[0], JobEvent::Started { sequences: 11 });
        assert!(matches!(events[1], JobEvent::Progress(p) if p.iteration == 1));
        assert_eq!(events[2], JobEvent::Succeeded(prediction));
        assert_eq!(events[3], JobEvent::Reset);
    }

    #[tokio::test]
    async fn training_failure_is_reported_once_then_resets() {
        let (orch, rx) = orchestrator(immediate(), SlowFactory::new(0, ScriptedPredictor::failing("diverged")));
        orch.ensure_engine().await.unwrap();

        let err = orch.run(&series_of(60), scale()).await.unwrap_err();
        assert_eq!(err, OrchestrationError::Training(TrainingError::new("diverged")));

        let events: Vec<JobEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], JobEvent::Started { .. }));
        let failures: Vec<&JobEvent> = events.iter().filter(|e| matches!(e, JobEvent::Failed(_))).collect();
        assert_eq!(failures, vec![&JobEvent::Failed("diverged".to_string())]);
        assert!(!events.iter().any(|e| matches!(e, JobEvent::Succeeded(_))));
        assert_eq!(events.last(), Some(&JobEvent::Reset));
        assert_eq!(orch.phase(), JobPhase::Idle);
    }

    #[tokio::test]
    async fn series_without_a_full_window_fails_the_job() {
        let output = NormalizedPoint::new(0.5, 0.6, 0.4, 0.55);
        let (orch, rx) = orchestrator(immediate(), SlowFactory::new(0, ScriptedPredictor::converging(output)));
        orch.ensure_engine().await.unwrap();

        // Five points with L = 5: the only candidate window would end on the last point.
        let err = orch.run(&series_of(5), scale()).await.unwrap_err();
        assert_eq!(err, OrchestrationError::NoSequences { points: 5, window: 5 });

        // Fails before training starts: no `Started`, just the failure and the reset.
        let events: Vec<JobEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], JobEvent::Failed(msg) if msg.contains("no training sequences")));
        assert_eq!(events[1], JobEvent::Reset);
    }

    #[tokio::test]
    async fn engine_becomes_ready_after_pending_attempts() {
        let factory = SlowFactory::new(2, ScriptedPredictor::failing("x"));
        let (orch, _rx) = orchestrator(immediate(), factory);
        orch.ensure_engine().await.unwrap();
        assert!(orch.engine_ready());
        // Already installed: no more factory calls needed.
        orch.ensure_engine().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn engine_retry_is_bounded() {
        let factory = SlowFactory::new(u32::MAX, ScriptedPredictor::failing("x"));
        let (orch, _rx) = orchestrator(FORECAST, factory);

        let started = tokio::time::Instant::now();
        let err = orch.ensure_engine().await.unwrap_err();
        assert_eq!(err, OrchestrationError::EngineUnavailable { attempts: 20 });
        // Sleeps between attempts, not after the last one.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(19 * 500), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(20 * 500), "{:?}", elapsed);
        assert!(!orch.engine_ready());
    }

    #[tokio::test]
    async fn factory_failure_is_surfaced() {
        let (orch, _rx) = orchestrator(immediate(), Arc::new(BrokenFactory));
        let err = orch.ensure_engine().await.unwrap_err();
        assert_eq!(err.to_string(), "model weights missing");
    }

    #[tokio::test]
    async fn second_job_is_refused_while_one_runs() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let predictor = ScriptedPredictor {
            entered: Some(Arc::clone(&entered)),
            release: Some(Arc::clone(&release)),
            ..ScriptedPredictor::converging(NormalizedPoint::new(0.5, 0.6, 0.4, 0.55))
        };
        let (orch, rx) = orchestrator(immediate(), SlowFactory::new(0, predictor));
        orch.ensure_engine().await.unwrap();
        let orch = Arc::new(orch);

        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.run(&series_of(60), scale()).await })
        };
        entered.notified().await;

        assert_eq!(orch.phase(), JobPhase::Running);
        assert!(orch.engine_ready());
        let err = orch.run(&series_of(60), scale()).await.unwrap_err();
        assert_eq!(err, OrchestrationError::AlreadyRunning);
        assert_eq!(
            orch.ensure_engine().await.unwrap_err(),
            OrchestrationError::AlreadyRunning
        );

        release.notify_one();
        assert!(first.await.unwrap().is_ok());

        let started = rx
            .try_iter()
            .filter(|e| matches!(e, JobEvent::Started { .. }))
            .count();
        assert_eq!(started, 1);
        assert_eq!(orch.phase(), JobPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_stays_locked_for_the_reset_delay() {
        let config = ForecastConfig {
            orchestrator: OrchestratorConfig {
                failure_reset_ms: 3000,
                ..OrchestratorConfig::IMMEDIATE
            },
            ..FORECAST
        };
        let (orch, rx) = orchestrator(config, SlowFactory::new(0, ScriptedPredictor::failing("diverged")));
        orch.ensure_engine().await.unwrap();
        let orch = Arc::new(orch);

        let job = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.run(&series_of(60), scale()).await })
        };

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(orch.phase(), JobPhase::Failed);
        assert_eq!(
            orch.run(&series_of(60), scale()).await.unwrap_err(),
            OrchestrationError::AlreadyRunning
        );
        assert!(!rx.try_iter().any(|e| e == JobEvent::Reset));

        assert!(job.await.unwrap().is_err());
        assert_eq!(orch.phase(), JobPhase::Idle);
        assert_eq!(rx.try_iter().last(), Some(JobEvent::Reset));
    }
}
