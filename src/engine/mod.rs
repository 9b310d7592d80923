mod core;
mod error;
mod inline;
mod messages;
mod predictor;
mod regressor;
mod state;
mod worker;

pub use core::{MIN_TRAINING_POINTS, TrainingOrchestrator};
pub use error::{OrchestrationError, TrainingError};
pub use inline::InlinePredictor;
pub use messages::{JobEvent, ProgressSender, TrainingProgress, TrainingSummary};
pub use predictor::{EngineStatus, PredictorFactory, SequenceEngine, SequencePredictor};
pub use regressor::{RegressorFactory, TimeStepRegressor};
pub use state::JobPhase;
pub use worker::WorkerPredictor;
