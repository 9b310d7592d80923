//! Configuration module for the forecast pipeline.

// Can all be private now because we have a public re-export.
mod debug;
mod forecast;
mod orchestrator;
mod training;
mod windowing;

// Re-export commonly used items
pub use debug::{DF, LogFlags};
pub use forecast::{FORECAST, ForecastConfig, LEGACY_FIXED_SCALE, ScalePolicy};
pub use orchestrator::{OrchestratorConfig, RetryPolicy};
pub use training::TrainingConfig;
pub use windowing::{SUPPORTED_WINDOW_LENGTHS, WindowConfig};
