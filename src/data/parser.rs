//! Upload entry point: raw bytes in, validated series and scale factor out.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use super::csv_series::scan_csv;
use super::json_series::scan_json;
use super::validation::{RowWarning, ValidationError};
use crate::config::ScalePolicy;
use crate::domain::{ScaleFactor, Series};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SeriesFormat {
    Csv,
    Json,
}

impl SeriesFormat {
    /// Infers the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        SeriesFormat::iter().find(|f| f.to_string() == ext)
    }
}

/// A successfully validated upload.
#[derive(Debug, Clone)]
pub struct ParsedSeries {
    pub series: Series,
    pub scale: ScaleFactor,
    /// Lines skipped without failing the upload.
    pub warnings: Vec<RowWarning>,
}

pub fn parse_series(
    raw: &[u8],
    format: SeriesFormat,
    policy: ScalePolicy,
) -> Result<ParsedSeries, ValidationError> {
    let scan = crate::trace_time!(&format!("Parse {} upload", format), 20_000, {
        match format {
            SeriesFormat::Csv => scan_csv(&String::from_utf8_lossy(raw))?,
            SeriesFormat::Json => scan_json(raw)?,
        }
    });

    scan.require_minimum()?;

    if !scan.warnings.is_empty() {
        log::warn!(
            "Parser: accepted {} rows, skipped {} lines",
            scan.points.len(),
            scan.warnings.len()
        );
        for warning in &scan.warnings {
            log::warn!("  {}", warning);
        }
    }

    let raw_scale = match policy {
        ScalePolicy::DatasetMax => scan.max_price_seen,
        ScalePolicy::Fixed(value) => value,
    };
    let scale = ScaleFactor::new(raw_scale).ok_or(ValidationError::InvalidScale(raw_scale))?;

    let series = Series::from_points(scan.points);

    #[cfg(debug_assertions)]
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        log::info!(
            "Parser: {} points from {} to {} (scale {})",
            series.len(),
            first.date,
            last.date,
            scale
        );
    }

    Ok(ParsedSeries {
        series,
        scale,
        warnings: scan.warnings,
    })
}

/// Reads a price file from disk. The format comes from `format` or else the extension.
pub async fn load_series_file(
    path: &Path,
    format: Option<SeriesFormat>,
    policy: ScalePolicy,
) -> Result<ParsedSeries> {
    let format = format
        .or_else(|| SeriesFormat::from_path(path))
        .ok_or_else(|| {
            anyhow!(
                "Cannot tell the format of {}; use one of: {}",
                path.display(),
                SeriesFormat::iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", ")
            )
        })?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read price file: {}", path.display()))?;

    parse_series(&bytes, format, policy)
        .with_context(|| format!("Rejected price file: {}", path.display()))
}
