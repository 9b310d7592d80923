mod perf;
pub mod time_utils;

pub use perf::report_if_slow;
pub use time_utils::{TimeUtils, format_date, format_duration, next_day, parse_calendar_date};
