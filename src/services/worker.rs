//! Background conversion worker.
//!
//! Job creation hands ids to the worker through an unbounded channel; the
//! worker spawns one pipeline run per id, at most `max_concurrent` at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::ConversionId;
use crate::services::pipeline::ConversionPipeline;

/// Worker submission errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Conversion worker is not running")]
    Closed,
}

/// Handle used to submit jobs to and stop the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::UnboundedSender<ConversionId>,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
    max_concurrent: u32,
}

impl WorkerHandle {
    /// Queue a job for processing.
    pub fn submit(&self, id: ConversionId) -> Result<(), WorkerError> {
        self.sender.send(id).map_err(|_| WorkerError::Closed)
    }

    /// Cancel in-flight runs and wait up to `grace` for them to record
    /// their outcome.
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();
        match tokio::time::timeout(grace, self.permits.acquire_many(self.max_concurrent)).await {
            Ok(_) => info!("Conversion worker stopped"),
            Err(_) => warn!("Conversion worker did not stop within {:?}", grace),
        }
    }
}

/// Start the worker task.
pub fn spawn_worker(
    pipeline: Arc<ConversionPipeline>,
    max_concurrent: usize,
    cancel: CancellationToken,
) -> WorkerHandle {
    let (sender, mut receiver) = mpsc::unbounded_channel::<ConversionId>();
    let max_concurrent = u32::try_from(max_concurrent.max(1)).unwrap_or(u32::MAX);
    let permits = Arc::new(Semaphore::new(max_concurrent as usize));

    let worker_permits = permits.clone();
    let worker_cancel = cancel.clone();
    tokio::spawn(async move {
        info!(
            "Conversion worker started (max concurrent runs: {})",
            max_concurrent
        );

        while let Some(id) = receiver.recv().await {
            let pipeline = pipeline.clone();
            let permits = worker_permits.clone();
            let cancel = worker_cancel.clone();

            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                debug!("Starting conversion {}", id);
                if let Err(e) = pipeline.run(&id, &cancel).await {
                    warn!("Conversion {} ended with error: {}", id, e);
                }
            });
        }

        debug!("Conversion worker channel closed");
    });

    WorkerHandle {
        sender,
        cancel,
        permits,
        max_concurrent,
    }
}
