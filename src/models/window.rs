//! Normalization and windowing: a validated series becomes fixed-length training sequences.

use serde::{Deserialize, Serialize};

use crate::config::WindowConfig;
use crate::domain::{OhlcPoint, ScaleFactor, Series};

/// An OHLC quadruple divided by the session scale factor. Carries no date.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl NormalizedPoint {
    pub const fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    pub fn from_point(point: &OhlcPoint, scale: ScaleFactor) -> Self {
        Self {
            open: scale.normalize(point.open),
            high: scale.normalize(point.high),
            low: scale.normalize(point.low),
            close: scale.normalize(point.close),
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        let [open, high, low, close] = values;
        Self::new(open, high, low, close)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// One training example: `length` consecutive normalized points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingSequence(Vec<NormalizedPoint>);

impl TrainingSequence {
    pub fn new(points: Vec<NormalizedPoint>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[NormalizedPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&NormalizedPoint> {
        self.0.last()
    }
}

/// Start indices of every window. A window `[i, i + length)` is taken while
/// `i + length < len`, so the final point never closes a window.
pub fn window_starts(len: usize, length: usize, stride: usize) -> impl Iterator<Item = usize> {
    (0..len)
        .step_by(stride.max(1))
        .take_while(move |i| length > 0 && i + length < len)
}

/// Normalizes the (optionally truncated) series and slices it into sequences.
pub fn build_sequences(
    series: &Series,
    scale: ScaleFactor,
    config: &WindowConfig,
) -> Vec<TrainingSequence> {
    let points = match config.recent_limit {
        Some(n) => series.tail(n),
        None => series.points(),
    };

    let normalized: Vec<NormalizedPoint> = points
        .iter()
        .map(|p| NormalizedPoint::from_point(p, scale))
        .collect();

    window_starts(normalized.len(), config.length, config.stride)
        .map(|start| TrainingSequence::new(normalized[start..start + config.length].to_vec()))
        .collect()
}
