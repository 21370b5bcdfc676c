use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::catch_task_panic;
use super::mark_all_as_read::MarkAllAsRead;
use crate::storage::StoryRepository;

pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// The only failures a submitter ever sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is full, try again shortly")]
    Full,

    #[error("Job queue is shut down")]
    Closed,
}

/// Bounded job queue drained by a fixed pool of worker tasks.
///
/// `submit` never waits on a job: it either hands the job off or fails with
/// `QueueError`. Accepted jobs run to completion; there is no cancellation.
pub struct JobQueue {
    tx: mpsc::Sender<MarkAllAsRead>,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    /// Spawn `workers` tasks on the current tokio runtime.
    ///
    /// Zero workers or zero capacity are clamped to 1.
    pub fn start(repository: Arc<dyn StoryRepository>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<MarkAllAsRead>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let repository = repository.clone();
                tokio::spawn(run_worker(worker, rx, repository))
            })
            .collect();

        Self { tx, workers }
    }

    /// Hand a job to the pool without waiting for it to run.
    pub fn submit(&self, job: MarkAllAsRead) -> Result<(), QueueError> {
        let stories = job.len();
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!(stories, "Job queue full, rejecting mark all as read");
                QueueError::Full
            }
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;
        tracing::debug!(stories, "Queued mark all as read");
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs and wait until every accepted job has finished.
    pub async fn shutdown(self) {
        drop(self.tx);
        for (worker, handle) in self.workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker, error = %e, "Job worker exited abnormally");
            }
        }
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<MarkAllAsRead>>>,
    repository: Arc<dyn StoryRepository>,
) {
    tracing::debug!(worker, "Job worker started");
    loop {
        // Hold the receiver lock only while waiting for the next job
        let job = rx.lock().await.recv().await;
        let Some(job) = job else { break };

        if let Err(panic) = catch_task_panic(job.mark_as_read(repository.as_ref())).await {
            tracing::error!(worker, error = %panic, "Mark all as read job panicked");
        }
    }
    tracing::debug!(worker, "Job worker stopped");
}
