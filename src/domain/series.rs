use chrono::NaiveDate;
use serde::Serialize;

use super::OhlcPoint;

/// Price history ordered ascending by date.
///
/// Ordering is the only invariant carried by the type. The acceptance floor for
/// uploads lives in the parser so that shorter series can still be built (and
/// rejected) further down the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    points: Vec<OhlcPoint>,
}

impl Series {
    /// Stable sort, so rows sharing a date keep their input order.
    pub fn from_points(mut points: Vec<OhlcPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn points(&self) -> &[OhlcPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&OhlcPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&OhlcPoint> {
        self.points.last()
    }

    /// The most recent `n` points (or all of them when the series is shorter).
    pub fn tail(&self, n: usize) -> &[OhlcPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// `(date, close)` pairs for the historical chart.
    pub fn close_history(&self) -> Vec<(NaiveDate, f64)> {
        self.points.iter().map(|p| (p.date, p.close)).collect()
    }

    /// Largest price of any field, 0.0 for an empty series.
    pub fn max_price(&self) -> f64 {
        self.points
            .iter()
            .map(OhlcPoint::max_price)
            .fold(0.0, f64::max)
    }
}
