//! Row-level checks shared by the CSV and JSON readers.

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::domain::OhlcPoint;
use crate::utils::parse_calendar_date;

/// Uploads with fewer accepted rows than this are rejected outright.
pub const MIN_SERIES_POINTS: usize = 50;

pub(crate) const REQUIRED_COLUMNS: [&str; 5] = ["date", "open", "high", "low", "close"];

/// A skipped input row and why it was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// 1-based line number for CSV, 1-based element index for JSON.
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed file: {0}")]
    MalformedFile(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error(
        "insufficient valid data: found {found} valid rows, at least {required} required{}",
        describe_warnings(.warnings)
    )]
    InsufficientData {
        found: usize,
        required: usize,
        warnings: Vec<RowWarning>,
    },

    #[error("scale factor must be a positive number, got {0}")]
    InvalidScale(f64),
}

fn describe_warnings(warnings: &[RowWarning]) -> String {
    if warnings.is_empty() {
        String::new()
    } else {
        format!(
            "\nSkipped {} lines:\n{}",
            warnings.len(),
            warnings.iter().join("\n")
        )
    }
}

/// Parses one price cell: trims, strips a leading `$`, requires a finite value > 0.
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let text = text.strip_prefix('$').unwrap_or(text).trim();
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Raw cells of one row, before any checks.
pub(crate) struct RawRow<'a> {
    pub date: &'a str,
    pub open: &'a str,
    pub high: &'a str,
    pub low: &'a str,
    pub close: &'a str,
}

/// Applies the date, positivity and OHLC ordering rules. `Err` carries the warning reason.
pub(crate) fn validate_row(row: &RawRow<'_>) -> Result<OhlcPoint, String> {
    let date =
        parse_calendar_date(row.date).ok_or_else(|| format!("Invalid date '{}'", row.date))?;

    let field = |name: &str, raw: &str| {
        parse_price(raw).ok_or_else(|| format!("Invalid {} value '{}'", name, raw))
    };
    let open = field("open", row.open)?;
    let high = field("high", row.high)?;
    let low = field("low", row.low)?;
    let close = field("close", row.close)?;

    check_point(OhlcPoint::new(date, open, high, low, close))
}

/// Ordering rule only, for inputs that already arrive as numbers.
pub(crate) fn check_point(point: OhlcPoint) -> Result<OhlcPoint, String> {
    if !point.has_positive_prices() {
        return Err(format!(
            "Non-positive price (open {}, high {}, low {}, close {})",
            point.open, point.high, point.low, point.close
        ));
    }
    if !point.has_consistent_range() {
        return Err(format!(
            "Invalid OHLC relationships (open {}, high {}, low {}, close {})",
            point.open, point.high, point.low, point.close
        ));
    }
    Ok(point)
}

/// Everything a reader collected from one file.
#[derive(Debug, Default)]
pub(crate) struct ScanOutcome {
    pub points: Vec<OhlcPoint>,
    pub warnings: Vec<RowWarning>,
    /// Largest parseable positive price seen anywhere, skipped rows included.
    pub max_price_seen: f64,
}

impl ScanOutcome {
    pub fn observe_price(&mut self, raw: &str) {
        if let Some(v) = parse_price(raw) {
            self.max_price_seen = self.max_price_seen.max(v);
        }
    }

    pub fn skip(&mut self, line: usize, reason: String) {
        #[cfg(debug_assertions)]
        if crate::config::DF.log_parser {
            log::debug!("Parser: skipping line {}: {}", line, reason);
        }
        self.warnings.push(RowWarning { line, reason });
    }

    /// Enforces the acceptance floor.
    pub fn require_minimum(&self) -> Result<(), ValidationError> {
        if self.points.len() < MIN_SERIES_POINTS {
            return Err(ValidationError::InsufficientData {
                found: self.points.len(),
                required: MIN_SERIES_POINTS,
                warnings: self.warnings.clone(),
            });
        }
        Ok(())
    }
}
