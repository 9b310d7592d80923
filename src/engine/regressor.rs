//! Built-in reference engine.
//!
//! A one-step linear recurrence over the four normalized price fields,
//! `next = W · current + b`, fitted with per-step gradient descent on squared
//! error. It starts as the identity (tomorrow looks like today) and learns the
//! drift from the training windows. Good enough to exercise the pipeline end to
//! end; forecasting quality is not its job.

use super::error::TrainingError;
use super::inline::InlinePredictor;
use super::messages::{TrainingProgress, TrainingSummary};
use super::predictor::{EngineStatus, PredictorFactory, SequenceEngine};
use super::worker::WorkerPredictor;
use crate::config::TrainingConfig;
use crate::models::{NormalizedPoint, TrainingSequence};

const FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeStepRegressor {
    weights: [[f64; FIELDS]; FIELDS],
    bias: [f64; FIELDS],
}

impl Default for TimeStepRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeStepRegressor {
    pub fn new() -> Self {
        let mut weights = [[0.0; FIELDS]; FIELDS];
        for (i, row) in weights.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self {
            weights,
            bias: [0.0; FIELDS],
        }
    }

    fn forward(&self, x: &[f64; FIELDS]) -> [f64; FIELDS] {
        let mut out = self.bias;
        for (o, row) in self.weights.iter().enumerate() {
            out[o] += row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>();
        }
        out
    }

    /// One pass over every consecutive pair. Returns the mean squared error of the pass.
    fn train_epoch(&mut self, sequences: &[TrainingSequence], learning_rate: f64) -> f64 {
        let mut sum_sq = 0.0;
        let mut count = 0usize;

        for seq in sequences {
            for pair in seq.points().windows(2) {
                let x = pair[0].to_array();
                let target = pair[1].to_array();
                let predicted = self.forward(&x);

                for o in 0..FIELDS {
                    let err = predicted[o] - target[o];
                    sum_sq += err * err;
                    for (w, xi) in self.weights[o].iter_mut().zip(&x) {
                        *w -= learning_rate * err * xi;
                    }
                    self.bias[o] -= learning_rate * err;
                }
                count += FIELDS;
            }
        }

        sum_sq / count.max(1) as f64
    }
}

impl SequenceEngine for TimeStepRegressor {
    fn name(&self) -> &str {
        "time-step regressor"
    }

    fn train(
        &mut self,
        sequences: &[TrainingSequence],
        config: &TrainingConfig,
        on_progress: &mut dyn FnMut(TrainingProgress),
    ) -> Result<TrainingSummary, TrainingError> {
        if !sequences.iter().any(|s| s.len() >= 2) {
            return Err(TrainingError::new(
                "training needs at least one sequence with two or more points",
            ));
        }

        let max = config.max_iterations.max(1);
        let every = config.progress_every.max(1);
        let mut summary = TrainingSummary {
            iterations: 0,
            error: f64::INFINITY,
            converged: false,
        };

        for iteration in 1..=max {
            let error = self.train_epoch(sequences, config.learning_rate);
            if !error.is_finite() {
                return Err(TrainingError::new(format!(
                    "training diverged at iteration {} (learning rate {})",
                    iteration, config.learning_rate
                )));
            }

            let converged = error <= config.error_threshold;
            summary = TrainingSummary {
                iterations: iteration,
                error,
                converged,
            };

            let done = converged || iteration == max;
            if iteration % every == 0 || done {
                on_progress(TrainingProgress::new(iteration, error, max));
            }
            if done {
                break;
            }
        }

        Ok(summary)
    }

    fn run(&self, sequence: &TrainingSequence) -> Result<NormalizedPoint, TrainingError> {
        let last = sequence
            .last()
            .ok_or_else(|| TrainingError::new("cannot predict from an empty sequence"))?;
        Ok(NormalizedPoint::from_array(self.forward(&last.to_array())))
    }
}

/// Builds a [`TimeStepRegressor`] predictor, inline or on its own worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressorFactory {
    pub isolated: bool,
}

impl RegressorFactory {
    pub fn inline() -> Self {
        Self { isolated: false }
    }

    pub fn isolated() -> Self {
        Self { isolated: true }
    }
}

impl PredictorFactory for RegressorFactory {
    fn try_create(&self) -> EngineStatus {
        let engine = TimeStepRegressor::new();
        if self.isolated {
            match WorkerPredictor::spawn(engine) {
                Ok(worker) => EngineStatus::Ready(Box::new(worker)),
                Err(e) => EngineStatus::Failed(e),
            }
        } else {
            EngineStatus::Ready(Box::new(InlinePredictor::new(engine)))
        }
    }
}
