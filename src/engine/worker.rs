use async_trait::async_trait;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use tokio::sync::oneshot;

use super::error::TrainingError;
use super::messages::{ProgressSender, TrainingSummary, WorkerRequest};
use super::predictor::{SequenceEngine, SequencePredictor, contain_engine_panic};
use crate::config::TrainingConfig;
use crate::models::{NormalizedPoint, TrainingSequence};

/// Owns the engine on a dedicated thread. The only link to it is the request
/// channel, so nothing mutable is shared with the caller.
pub struct WorkerPredictor {
    name: String,
    requests: Sender<WorkerRequest>,
}

impl WorkerPredictor {
    pub fn spawn<E: SequenceEngine>(engine: E) -> Result<Self, TrainingError> {
        let name = format!("{} (worker)", engine.name());
        let (tx, rx) = channel::<WorkerRequest>();
        spawn_worker_thread(engine, rx)?;
        Ok(Self { name, requests: tx })
    }

    fn submit(&self, request: WorkerRequest) -> Result<(), TrainingError> {
        self.requests
            .send(request)
            .map_err(|_| TrainingError::new("predictor worker has shut down"))
    }
}

/// Spawns the worker loop. It exits when every request sender is dropped;
/// engine panics are answered as errors and do not end it.
pub(crate) fn spawn_worker_thread<E: SequenceEngine>(
    mut engine: E,
    rx: Receiver<WorkerRequest>,
) -> Result<(), TrainingError> {
    thread::Builder::new()
        .name("predictor-worker".to_string())
        .spawn(move || {
            while let Ok(req) = rx.recv() {
                process_request_sync(&mut engine, req);
            }
            log::debug!("Worker: request channel closed, stopping {}", engine.name());
        })
        .map(|_| ())
        .map_err(|e| TrainingError::new(format!("failed to start predictor worker: {}", e)))
}

pub(crate) fn process_request_sync<E: SequenceEngine>(engine: &mut E, req: WorkerRequest) {
    match req {
        WorkerRequest::Train {
            sequences,
            config,
            progress,
            reply,
        } => {
            let result = crate::trace_time!("Worker: train", 1_000_000, {
                contain_engine_panic("train", || {
                    engine.train(&sequences, &config, &mut |p| {
                        let _ = progress.send(p);
                    })
                })
            });
            // Close the progress stream before the reply so no event trails the outcome.
            drop(progress);
            let _ = reply.send(result);
        }
        WorkerRequest::Run { sequence, reply } => {
            let _ = reply.send(contain_engine_panic("run", || engine.run(&sequence)));
        }
    }
}

#[async_trait]
impl SequencePredictor for WorkerPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn train(
        &mut self,
        sequences: Arc<[TrainingSequence]>,
        config: TrainingConfig,
        progress: ProgressSender,
    ) -> Result<TrainingSummary, TrainingError> {
        let (reply, outcome) = oneshot::channel();
        self.submit(WorkerRequest::Train {
            sequences,
            config,
            progress,
            reply,
        })?;
        outcome
            .await
            .map_err(|_| TrainingError::new("predictor worker stopped before finishing training"))?
    }

    async fn run(&mut self, sequence: TrainingSequence) -> Result<NormalizedPoint, TrainingError> {
        let (reply, outcome) = oneshot::channel();
        self.submit(WorkerRequest::Run { sequence, reply })?;
        outcome
            .await
            .map_err(|_| TrainingError::new("predictor worker stopped before answering"))?
    }
}
