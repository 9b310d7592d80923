mod forecast;
mod window;

pub use forecast::{Forecast, Prediction};
pub use window::{NormalizedPoint, TrainingSequence, build_sequences, window_starts};
