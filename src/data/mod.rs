mod csv_series;
mod json_series;
mod parser;
mod validation;

pub use {
    parser::{ParsedSeries, SeriesFormat, load_series_file, parse_series},
    validation::{MIN_SERIES_POINTS, RowWarning, ValidationError},
};
