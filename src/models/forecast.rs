use chrono::NaiveDate;
use serde::Serialize;

use super::NormalizedPoint;
use crate::domain::{OhlcPoint, ScaleFactor, Trend};
use crate::utils::next_day;

/// A denormalized next-step prediction. The caller decides which day it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Prediction {
    pub fn denormalize(point: NormalizedPoint, scale: ScaleFactor) -> Self {
        Self {
            open: scale.denormalize(point.open),
            high: scale.denormalize(point.high),
            low: scale.denormalize(point.low),
            close: scale.denormalize(point.close),
        }
    }

    /// Field-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Prediction, tolerance: f64) -> bool {
        (self.open - other.open).abs() <= tolerance
            && (self.high - other.high).abs() <= tolerance
            && (self.low - other.low).abs() <= tolerance
            && (self.close - other.close).abs() <= tolerance
    }
}

/// What the presentation layer shows after a successful job.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub prediction: Prediction,
    /// Calendar day after the last point of the series.
    pub target_date: Option<NaiveDate>,
    pub last_point: OhlcPoint,
    pub trend: Trend,
}

impl Forecast {
    pub fn new(prediction: Prediction, last_point: OhlcPoint) -> Self {
        Self {
            prediction,
            target_date: next_day(last_point.date),
            last_point,
            trend: Trend::from_closes(last_point.close, prediction.close),
        }
    }

    pub fn close_change_pct(&self) -> f64 {
        (self.prediction.close - self.last_point.close) / self.last_point.close * 100.0
    }
}
