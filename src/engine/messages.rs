use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::error::TrainingError;
use crate::config::TrainingConfig;
use crate::models::{NormalizedPoint, Prediction, TrainingSequence};

/// One progress report from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingProgress {
    pub iteration: usize,
    pub error: f64,
    /// `iteration / max_iterations`
    pub fraction: f64,
}

impl TrainingProgress {
    pub fn new(iteration: usize, error: f64, max_iterations: usize) -> Self {
        Self {
            iteration,
            error,
            fraction: iteration as f64 / max_iterations.max(1) as f64,
        }
    }

    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub error: f64,
    /// Stopped because the error reached the threshold rather than the iteration cap.
    pub converged: bool,
}

pub type ProgressSender = mpsc::UnboundedSender<TrainingProgress>;

/// What the orchestrator tells the outside world about a job, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The job took the lock. Start controls should be disabled.
    Started { sequences: usize },
    Progress(TrainingProgress),
    Succeeded(Prediction),
    Failed(String),
    /// Back to idle. Start controls may be re-enabled.
    Reset,
}

/// Messages to an isolated predictor worker.
pub(crate) enum WorkerRequest {
    Train {
        sequences: Arc<[TrainingSequence]>,
        config: TrainingConfig,
        progress: ProgressSender,
        reply: oneshot::Sender<Result<TrainingSummary, TrainingError>>,
    },
    Run {
        sequence: TrainingSequence,
        reply: oneshot::Sender<Result<NormalizedPoint, TrainingError>>,
    },
}
