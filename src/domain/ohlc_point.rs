use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Direction of a forecast relative to the last known close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// `Up` only when the predicted close is strictly above the last close.
    pub fn from_closes(last_close: f64, predicted_close: f64) -> Self {
        if predicted_close > last_close {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

/// One trading day of price history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcPoint {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        OhlcPoint {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// All four prices finite and strictly positive.
    pub fn has_positive_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// Low is the floor and high the ceiling of the open and close.
    pub fn has_consistent_range(&self) -> bool {
        self.low <= self.high
            && self.open <= self.high
            && self.close <= self.high
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn max_price(&self) -> f64 {
        self.open.max(self.high).max(self.low).max(self.close)
    }

    pub fn prices(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}
