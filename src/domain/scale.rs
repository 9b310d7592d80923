use serde::{Deserialize, Serialize};

/// Divisor mapping raw prices into the predictor's roughly `[0, 1]` range.
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn normalize(self, price: f64) -> f64 {
        price / self.0
    }

    #[inline]
    pub fn denormalize(self, value: f64) -> f64 {
        value * self.0
    }
}

impl TryFrom<f64> for ScaleFactor {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("scale factor must be positive, got {}", value))
    }
}

impl From<ScaleFactor> for f64 {
    fn from(scale: ScaleFactor) -> Self {
        scale.0
    }
}

impl std::fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
