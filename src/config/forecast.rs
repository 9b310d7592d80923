//! The master forecast configuration: const blueprint, optional JSON override file.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{OrchestratorConfig, TrainingConfig, WindowConfig};

/// Price divisor observed in earlier deployments before the dataset-max policy.
pub const LEGACY_FIXED_SCALE: f64 = 138.0;

/// How the scale factor for one uploaded dataset is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalePolicy {
    /// Largest open/high/low/close value seen in the upload.
    #[default]
    DatasetMax,
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub window: WindowConfig,
    pub training: TrainingConfig,
    pub scale: ScalePolicy,
    pub orchestrator: OrchestratorConfig,
}

pub const FORECAST: ForecastConfig = ForecastConfig {
    window: WindowConfig::DEFAULT,
    training: TrainingConfig::DEFAULT,
    scale: ScalePolicy::DatasetMax,
    orchestrator: OrchestratorConfig::DEFAULT,
};

impl Default for ForecastConfig {
    fn default() -> Self {
        FORECAST
    }
}

impl ForecastConfig {
    /// Reads a JSON override file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        cfg.validate()
            .map_err(|e| anyhow!("Invalid config in {}: {}", path.display(), e))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.window.validate()?;
        self.training.validate()?;
        self.orchestrator.validate()?;
        if let ScalePolicy::Fixed(v) = self.scale {
            if !(v.is_finite() && v > 0.0) {
                return Err(format!("fixed scale must be positive, got {}", v));
            }
        }
        Ok(())
    }
}
