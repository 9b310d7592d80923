//! CSV reader: header-driven column lookup, per-line skip with warnings.

use csv::{ReaderBuilder, StringRecord, Trim};

use super::validation::{REQUIRED_COLUMNS, RawRow, ScanOutcome, ValidationError, validate_row};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Positions of the required columns inside the header.
struct ColumnMap {
    width: usize,
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
}

impl ColumnMap {
    fn from_header(header: &StringRecord) -> Result<Self, ValidationError> {
        let names: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |col: &str| names.iter().position(|n| n == col);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| find(col).is_none())
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingColumns(missing));
        }

        let idx = |col: &str| find(col).unwrap_or_default();
        Ok(Self {
            width: names.len(),
            date: idx("date"),
            open: idx("open"),
            high: idx("high"),
            low: idx("low"),
            close: idx("close"),
        })
    }

    fn price_columns(&self) -> [usize; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// Scans CSV text into accepted points plus warnings for every skipped line.
pub(crate) fn scan_csv(text: &str) -> Result<ScanOutcome, ValidationError> {
    let text = text.trim_start_matches(BYTE_ORDER_MARK).trim();

    let line_count = text.lines().count();
    if line_count < 2 {
        return Err(ValidationError::MalformedFile(format!(
            "expected a header row and at least one data row, found {} line(s)",
            line_count
        )));
    }

    // Plain comma splitting: quotes are ordinary characters, ragged rows are allowed.
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(Ok(header)) => header,
        Some(Err(e)) => return Err(ValidationError::MalformedFile(e.to_string())),
        None => return Err(ValidationError::MalformedFile("empty file".to_string())),
    };
    let columns = ColumnMap::from_header(&header)?;

    let mut scan = ScanOutcome::default();
    for (idx, result) in records.enumerate() {
        // Header is line 1; fall back to the record index when the reader has no position.
        let fallback_line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                scan.skip(line, format!("Unreadable line: {}", e));
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        // Only a truly blank line is skipped silently; a row of empty cells is reported.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        for col in columns.price_columns() {
            if let Some(cell) = record.get(col) {
                scan.observe_price(cell);
            }
        }

        if record.len() != columns.width {
            scan.skip(
                line,
                format!(
                    "Expected {} columns, found {}",
                    columns.width,
                    record.len()
                ),
            );
            continue;
        }

        let row = RawRow {
            date: &record[columns.date],
            open: &record[columns.open],
            high: &record[columns.high],
            low: &record[columns.low],
            close: &record[columns.close],
        };
        match validate_row(&row) {
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
    fn rejects_header_only_and_empty_files() {
        for text in ["", "   \n  ", "date,open,high,low,close", "\u{feff}date,open,high,low,close\r\n"] {
            let err = scan_csv(text).unwrap_err();
            assert!(matches!(err, ValidationError::MalformedFile(_)), "{:?}", text);
        }
    }

    #[test]
    fn names_every_missing_column() {
        let err = scan_csv("Date,Open,Volume\n2024-01-01,1,100").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumns(vec![
                "high".to_string(),
                "low".to_string(),
                "close".to_string()
            ])
        );
    }

    #[test]
    fn header_is_case_insensitive_and_order_independent() {
        let text = "\u{feff}Volume, CLOSE ,Low,High,Open,DATE\r\n\
                    900,$8,5,10,$7,2024-01-02\r\n\
                    \r\n\
                    100,9,6,11,8,2024-01-01\r\n";
        let scan = scan_csv(text).unwrap();
        assert!(scan.warnings.is_empty());
        assert_eq!(scan.points.len(), 2);
        let first = scan.points[0];
        assert_eq!(
            (first.open, first.high, first.low, first.close),
            (7.0, 10.0, 5.0, 8.0)
        );
        assert_eq!(first.date.to_string(), "2024-01-02");
        // Volume is not a price column.
        assert_eq!(scan.max_price_seen, 11.0);
    }

    #[test]
    fn skipped_lines_carry_line_numbers() {
        let text = "date,open,high,low,close\n\
                    2024-01-01,7,10,5,8\n\
                    2024-01-02,7,10,5\n\
                    bad-date,7,10,5,8\n\
                    2024-01-04,7,5,10,8\n\
                    2024-01-05,7,10,5,8";
        let scan = scan_csv(text).unwrap();
        assert_eq!(scan.points.len(), 2);
        let lines: Vec<usize> = scan.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert_eq!(scan.warnings[0].reason, "Expected 5 columns, found 4");
        assert!(scan.warnings[2].reason.starts_with("Invalid OHLC relationships"));
    }

    #[test]
    fn row_of_empty_cells_is_reported() {
        let mut text = String::from("date,open,high,low,close\n");
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for day in 0..50 {
            text.push_str(&format!("{},7,10,5,8\n", start + chrono::Days::new(day)));
        }
        text.push_str(",,,,\n2024-03-01,7,10,5,8\n");
        let scan = scan_csv(&text).unwrap();
        assert_eq!(scan.points.len(), 51);
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scan.warnings[0].line, 52);
        assert_eq!(scan.warnings[0].reason, "Invalid date ''");
    }

    #[test]
    fn scale_scan_includes_rejected_rows() {
        let text = "date,open,high,low,close\n\
                    2024-01-01,7,10,5,8\n\
                    2024-01-02,7,500,900,8";
        let scan = scan_csv(text).unwrap();
        assert_eq!(scan.points.len(), 1);
        assert_eq!(scan.max_price_seen, 900.0);
    }
}
