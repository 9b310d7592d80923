use thiserror::Error;

/// A fault raised by the predictor engine while training or predicting.
/// The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TrainingError(pub String);

impl TrainingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    #[error("predictor engine is not initialised")]
    NotReady,

    #[error("series too short for training: {found} points, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error("windowing produced no training sequences ({points} points, window length {window})")]
    NoSequences { points: usize, window: usize },

    #[error("a training job is already running")]
    AlreadyRunning,

    #[error("predictor engine still unavailable after {attempts} attempts")]
    EngineUnavailable { attempts: u32 },

    #[error("no dataset loaded, upload a price file first")]
    NoDataset,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Training(#[from] TrainingError),
}
