#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]

// Core modules
pub mod app;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate
pub use app::Session;
pub use config::{FORECAST, ForecastConfig, ScalePolicy};
pub use data::{ParsedSeries, SeriesFormat, ValidationError, load_series_file, parse_series};
pub use domain::{OhlcPoint, ScaleFactor, Series, Trend};
pub use engine::{
    JobEvent, JobPhase, OrchestrationError, RegressorFactory, TrainingError, TrainingOrchestrator,
};
pub use models::{Forecast, Prediction};

// CLI argument parsing
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Price history file (.csv or .json)
    pub file: PathBuf,

    /// Input format. Inferred from the file extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<SeriesFormat>,

    /// JSON file overriding the built-in configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Window length (points per training sequence)
    #[arg(long)]
    pub window: Option<usize>,

    /// Step between window starts
    #[arg(long)]
    pub stride: Option<usize>,

    /// Only window the most recent N points
    #[arg(long, conflicts_with = "all")]
    pub recent: Option<usize>,

    /// Window the whole history
    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// Divide prices by this value instead of the dataset maximum
    #[arg(long)]
    pub fixed_scale: Option<f64>,

    #[arg(long)]
    pub iterations: Option<usize>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub error_threshold: Option<f64>,

    /// Report progress every N iterations
    #[arg(long)]
    pub progress_every: Option<usize>,

    /// Train on the calling task instead of a dedicated worker thread
    #[arg(long, default_value_t = false)]
    pub inline: bool,

    /// Milliseconds a failed job holds the lock before the session resets.
    /// Defaults to 0 unless the config file sets it
    #[arg(long)]
    pub failure_reset_ms: Option<u64>,
}

impl Cli {
    /// Built-in blueprint, then the optional config file, then individual flags.
    pub fn resolve_config(&self) -> Result<ForecastConfig> {
        let mut config = match &self.config {
            Some(path) => ForecastConfig::load(path)?,
            None => FORECAST,
        };

        if let Some(length) = self.window {
            config.window.length = length;
        }
        if let Some(stride) = self.stride {
            config.window.stride = stride;
        }
        if self.all {
            config.window.recent_limit = None;
        } else if let Some(recent) = self.recent {
            config.window.recent_limit = Some(recent);
        }
        if let Some(scale) = self.fixed_scale {
            config.scale = ScalePolicy::Fixed(scale);
        }
        if let Some(iterations) = self.iterations {
            config.training.max_iterations = iterations;
        }
        if let Some(rate) = self.learning_rate {
            config.training.learning_rate = rate;
        }
        if let Some(threshold) = self.error_threshold {
            config.training.error_threshold = threshold;
        }
        if let Some(every) = self.progress_every {
            config.training.progress_every = every;
        }
        // A one-shot run exits right after the job, so the failure hold is wasted time.
        if let Some(ms) = self.failure_reset_ms {
            config.orchestrator.failure_reset_ms = ms;
        } else if self.config.is_none() {
            config.orchestrator.failure_reset_ms = 0;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        Ok(config)
    }

    pub fn factory(&self) -> RegressorFactory {
        if self.inline {
            RegressorFactory::inline()
        } else {
            RegressorFactory::isolated()
        }
    }
}
