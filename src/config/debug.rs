//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Emit every progress event the orchestrator forwards (can be chatty on long runs).
    pub log_progress: bool,

    /// Emit per-line parser warnings as they are collected, not just the summary.
    pub log_parser: bool,

    /// Emit each engine initialisation attempt while the predictor is pending.
    pub log_engine_init: bool,

    /// Activate trace_time macro (for cool scope-level timing)
    pub log_performance: bool,

    /// Log phase transitions of the training job.
    pub log_job_state: bool,
}

pub const DF: LogFlags = LogFlags {
    log_job_state: true,

    log_progress: false,
    log_parser: false,
    log_engine_init: false,
    log_performance: false,
};
