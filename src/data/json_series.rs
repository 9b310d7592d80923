//! JSON reader: an array of `{date, open, high, low, close}` objects.

use serde::Deserialize;

use super::validation::{ScanOutcome, ValidationError, check_point};
use crate::domain::OhlcPoint;
use crate::utils::parse_calendar_date;

#[derive(Debug, Deserialize)]
struct JsonRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

pub(crate) fn scan_json(bytes: &[u8]) -> Result<ScanOutcome, ValidationError> {
    let rows: Vec<JsonRow> = serde_json::from_slice(bytes)
        .map_err(|e| ValidationError::MalformedFile(format!("invalid JSON price array: {}", e)))?;

    let mut scan = ScanOutcome::default();
    for (idx, row) in rows.into_iter().enumerate() {
        let line = idx + 1;

        for v in [row.open, row.high, row.low, row.close] {
            if v.is_finite() && v > 0.0 {
                scan.max_price_seen = scan.max_price_seen.max(v);
            }
        }

        let Some(date) = parse_calendar_date(&row.date) else {
            scan.skip(line, format!("Invalid date '{}'", row.date));
            continue;
        };

        match check_point(OhlcPoint::new(date, row.open, row.high, row.low, row.close)) {
            Ok(point) => scan.points.push(point),
            Err(reason) => scan.skip(line, reason),
        }
    }

    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_malformed() {
        for text in ["", "{}", "[{\"date\": \"2024-01-01\"}]", "[{\"date\": 1, \"open\": 1, \"high\": 1, \"low\": 1, \"close\": 1}]"] {
            let err = scan_json(text.as_bytes()).unwrap_err();
            assert!(matches!(err, ValidationError::MalformedFile(_)), "{}", text);
        }
    }

    #[test]
    fn applies_the_same_row_rules_as_csv() {
        let text = r#"[
            {"date": "2024-01-02", "open": 7, "high": 10, "low": 5, "close": 8, "volume": 1200},
            {"date": "2024-01-03", "open": 7, "high": 5, "low": 10, "close": 8},
            {"date": "someday", "open": 7, "high": 10, "low": 5, "close": 8},
            {"date": "2024-01-05", "open": -1, "high": 10, "low": 5, "close": 8},
            {"date": "2024-01-06T00:00:00Z", "open": 7.5, "high": 12, "low": 6, "close": 11}
        ]"#;
        let scan = scan_json(text.as_bytes()).unwrap();
        assert_eq!(scan.points.len(), 2);
        assert_eq!(scan.points[1].date.to_string(), "2024-01-06");

        let lines: Vec<usize> = scan.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert!(scan.warnings[0].reason.starts_with("Invalid OHLC relationships"));
        assert_eq!(scan.warnings[1].reason, "Invalid date 'someday'");
        assert!(scan.warnings[2].reason.starts_with("Non-positive price"));
        assert_eq!(scan.max_price_seen, 12.0);
    }
}
