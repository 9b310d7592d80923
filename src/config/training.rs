//! Training hyperparameters handed to the predictor

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    /// Training stops as soon as the iteration error drops to this value.
    pub error_threshold: f64,
    pub max_iterations: usize,
    /// A progress event is emitted at least once per this many iterations.
    pub progress_every: usize,
}

impl TrainingConfig {
    pub const DEFAULT: Self = Self {
        learning_rate: 0.05,
        error_threshold: 0.0005,
        max_iterations: 2000,
        progress_every: 100,
    };

    pub fn validate(&self) -> Result<(), String> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.error_threshold.is_finite() && self.error_threshold > 0.0) {
            return Err(format!(
                "error_threshold must be positive, got {}",
                self.error_threshold
            ));
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        if self.progress_every == 0 {
            return Err("progress_every must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
