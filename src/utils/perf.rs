use std::time::{Duration, Instant};

/// Times `$block` when `DF.log_performance` is on and warns if it ran longer
/// than `$threshold_micros` (500 = 0.5ms). Evaluates to the block's value.
#[macro_export]
macro_rules! trace_time {
    ($name:expr, $threshold_micros:expr, $block:block) => {{
        if $crate::config::DF.log_performance {
            let started = std::time::Instant::now();
            let result = $block;
            $crate::utils::report_if_slow($name, started, $threshold_micros);
            result
        } else {
            $block
        }
    }};
}

#[doc(hidden)]
pub fn report_if_slow(name: &str, started: Instant, threshold_micros: u64) {
    if let Some(msg) = slow_message(name, started.elapsed(), threshold_micros) {
        log::warn!("{}", msg);
    }
}

fn slow_message(name: &str, elapsed: Duration, threshold_micros: u64) -> Option<String> {
    let threshold = Duration::from_micros(threshold_micros);
    if elapsed <= threshold {
        return None;
    }
    let build = if cfg!(debug_assertions) { "debug" } else { "release" };
    Some(format!(
        "SLOW [{}]: '{}' took {:.3}ms (threshold {:.3}ms)",
        build,
        name,
        elapsed.as_secs_f64() * 1000.0,
        threshold.as_secs_f64() * 1000.0
    ))
}
