//! The predictor boundary.
//!
//! [`SequenceEngine`] is the synchronous capability a concrete model offers.
//! [`SequencePredictor`] is what the orchestrator talks to: the same train/run
//! contract, but asynchronous so the engine may live on the caller's task
//! ([`InlinePredictor`](super::InlinePredictor)) or on its own thread
//! ([`WorkerPredictor`](super::WorkerPredictor)).

use async_trait::async_trait;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::error::TrainingError;
use super::messages::{ProgressSender, TrainingProgress, TrainingSummary};
use crate::config::TrainingConfig;
use crate::models::{NormalizedPoint, TrainingSequence};

pub trait SequenceEngine: Send + 'static {
    fn name(&self) -> &str;

    /// Trains until `max_iterations` or until the error reaches `error_threshold`.
    /// Must call `on_progress` at least once per `progress_every` iterations.
    fn train(
        &mut self,
        sequences: &[TrainingSequence],
        config: &TrainingConfig,
        on_progress: &mut dyn FnMut(TrainingProgress),
    ) -> Result<TrainingSummary, TrainingError>;

    /// Predicts the normalized point that follows `sequence`.
    fn run(&self, sequence: &TrainingSequence) -> Result<NormalizedPoint, TrainingError>;
}

#[async_trait]
pub trait SequencePredictor: Send {
    fn name(&self) -> &str;

    async fn train(
        &mut self,
        sequences: Arc<[TrainingSequence]>,
        config: TrainingConfig,
        progress: ProgressSender,
    ) -> Result<TrainingSummary, TrainingError>;

    async fn run(&mut self, sequence: TrainingSequence) -> Result<NormalizedPoint, TrainingError>;
}

/// Outcome of one attempt to bring up the predictor.
pub enum EngineStatus {
    Ready(Box<dyn SequencePredictor>),
    /// The backing engine is still loading; try again later.
    Pending,
    Failed(TrainingError),
}

/// Creates the session's predictor. Polled by the orchestrator until ready.
pub trait PredictorFactory: Send + Sync {
    fn try_create(&self) -> EngineStatus;
}

/// Runs one engine call, turning a panic into a `TrainingError` so the job
/// fails cleanly and the engine's thread (or the caller's task) survives.
pub(crate) fn contain_engine_panic<T>(
    operation: &str,
    call: impl FnOnce() -> Result<T, TrainingError>,
) -> Result<T, TrainingError> {
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("Engine: panicked during {}: {}", operation, reason);
        Err(TrainingError::new(format!(
            "engine panicked during {}: {}",
            operation, reason
        )))
    })
}
