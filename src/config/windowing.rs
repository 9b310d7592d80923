//! Windowing configuration (how a series becomes training sequences)

use serde::{Deserialize, Serialize};

/// Window lengths the predictor is known to work with.
pub const SUPPORTED_WINDOW_LENGTHS: [usize; 2] = [3, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Points per training sequence (3 or 5).
    pub length: usize,
    /// Distance between window starts. Equal to `length` gives non-overlapping windows.
    pub stride: usize,
    /// Only the most recent N points are windowed. `None` uses the whole series.
    pub recent_limit: Option<usize>,
}

impl WindowConfig {
    pub const DEFAULT: Self = Self {
        length: 5,
        stride: 5,
        recent_limit: Some(365),
    };

    pub fn validate(&self) -> Result<(), String> {
        if !SUPPORTED_WINDOW_LENGTHS.contains(&self.length) {
            return Err(format!(
                "window length must be one of {:?}, got {}",
                SUPPORTED_WINDOW_LENGTHS, self.length
            ));
        }
        if ![1, 2, self.length].contains(&self.stride) {
            return Err(format!(
                "stride must be 1, 2 or the window length ({}), got {}",
                self.length, self.stride
            ));
        }
        if self.recent_limit == Some(0) {
            return Err("recent_limit must be positive when set".to_string());
        }
        Ok(())
    }

    pub fn is_overlapping(&self) -> bool {
        self.stride < self.length
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
