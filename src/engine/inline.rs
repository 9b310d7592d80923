use async_trait::async_trait;
use std::sync::Arc;

use super::error::TrainingError;
use super::messages::{ProgressSender, TrainingSummary};
use super::predictor::{SequenceEngine, SequencePredictor, contain_engine_panic};
use crate::config::TrainingConfig;
use crate::models::{NormalizedPoint, TrainingSequence};

/// Runs the engine on the caller's task. `train` blocks that task until done.
pub struct InlinePredictor<E: SequenceEngine> {
    engine: E,
}

impl<E: SequenceEngine> InlinePredictor<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[async_trait]
impl<E: SequenceEngine> SequencePredictor for InlinePredictor<E> {
    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn train(
        &mut self,
        sequences: Arc<[TrainingSequence]>,
        config: TrainingConfig,
        progress: ProgressSender,
    ) -> Result<TrainingSummary, TrainingError> {
        let engine = &mut self.engine;
        contain_engine_panic("train", || {
            engine.train(&sequences, &config, &mut |p| {
                let _ = progress.send(p);
            })
        })
    }

    async fn run(&mut self, sequence: TrainingSequence) -> Result<NormalizedPoint, TrainingError> {
        contain_engine_panic("run", || self.engine.run(&sequence))
    }
}
