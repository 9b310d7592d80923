//! Job orchestration timing and engine start-up retry

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded polling for an engine that is not ready yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub const DEFAULT: Self = Self {
        max_attempts: 20,
        delay_ms: 500,
    };

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How long a failed job stays in `Failed` before the session unlocks.
    /// Gives a human time to read the error. Automated callers set 0.
    pub failure_reset_ms: u64,
    pub success_reset_ms: u64,
    pub engine_init: RetryPolicy,
}

impl OrchestratorConfig {
    pub const DEFAULT: Self = Self {
        failure_reset_ms: 3000,
        success_reset_ms: 0,
        engine_init: RetryPolicy::DEFAULT,
    };

    /// No display delays, engine polled quickly. Used by tests and batch callers.
    pub const IMMEDIATE: Self = Self {
        failure_reset_ms: 0,
        success_reset_ms: 0,
        engine_init: RetryPolicy {
            max_attempts: 3,
            delay_ms: 0,
        },
    };

    pub fn failure_reset_delay(&self) -> Duration {
        Duration::from_millis(self.failure_reset_ms)
    }

    pub fn success_reset_delay(&self) -> Duration {
        Duration::from_millis(self.success_reset_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.engine_init.max_attempts == 0 {
            return Err("engine_init.max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
