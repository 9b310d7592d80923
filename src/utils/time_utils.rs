use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub struct TimeUtils;

impl TimeUtils {
    pub const STANDARD_DATE_FORMAT: &str = "%Y-%m-%d";

    /// Date-only layouts accepted in uploaded files, tried in order.
    /// Slash dates are read month first.
    const DATE_FORMATS: [&str; 7] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d-%b-%Y",
        "%b %d %Y",
        "%b %d, %Y",
        "%Y%m%d",
    ];

    /// Timestamp layouts whose time part is discarded.
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
}

/// Parses a calendar date (day resolution) from the formats seen in price exports.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in TimeUtils::DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    TimeUtils::DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(TimeUtils::STANDARD_DATE_FORMAT).to_string()
}

/// The calendar day after `date`. Weekends and holidays are not skipped.
pub fn next_day(date: NaiveDate) -> Option<NaiveDate> {
    date.succ_opt()
}

pub fn format_duration(ms: i64) -> String {
    if ms < 1000 {
        return format!("{}ms", ms);
    }
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{:.1}s", ms as f64 / 1000.0);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m {}s", mins, secs % 60);
    }
    let hours = mins / 60;
    format!("{}h {}m", hours, mins % 60)
}
