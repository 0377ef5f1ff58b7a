use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{Result, StorageError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchItemError {
    pub item: String,
    pub error: String,
}

/// Outcome of a batch. Items appear in the order they finished.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub success_count: usize,
    pub error_count: usize,
    pub completed: Vec<T>,
    pub errors: Vec<BatchItemError>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            completed: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

/// Runs independent jobs with at most `width` of them in flight.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    width: usize,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Each item carries a label used in its error entry. A failing job is
    /// recorded and the rest keep going.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<(String, I)>, job: F) -> BatchReport<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let total = items.len();
        let permits = Arc::new(Semaphore::new(self.width));
        let job = Arc::new(job);
        let mut tasks = JoinSet::new();

        for (label, item) in items {
            let permits = Arc::clone(&permits);
            let job = Arc::clone(&job);
            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => job(item).await,
                    Err(_) => Err(StorageError::Storage("worker pool closed".into())),
                };
                (label, outcome)
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((label, Ok(value))) => {
                    debug!(item = %label, "batch item finished");
                    report.completed.push(value);
                }
                Ok((label, Err(e))) => {
                    warn!(item = %label, error = %e, "batch item failed");
                    report.errors.push(BatchItemError {
                        item: label,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "batch worker panicked");
                    report.errors.push(BatchItemError {
                        item: "unknown".into(),
                        error: StorageError::from(e).to_string(),
                    });
                }
            }
        }

        report.success_count = report.completed.len();
        report.error_count = report.errors.len();
        info!(
            total,
            succeeded = report.success_count,
            failed = report.error_count,
            width = self.width,
            "batch finished"
        );
        report
    }
}
