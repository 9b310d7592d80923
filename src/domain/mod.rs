// Domain types and value objects
mod ohlc_point;
mod scale;
mod series;

// Re-export commonly used types to the world
pub use ohlc_point::{OhlcPoint, Trend};
pub use scale::ScaleFactor;
pub use series::Series;
