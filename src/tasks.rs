//! Background task tracking
//!
//! Memory posts and summary rounds run detached from the inbound-message
//! handler. They are kept in a join set so the gateway can wait for them on
//! shutdown instead of dropping them mid-request.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

/// Shared set of fire-and-forget tasks
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task. Finished tasks are reaped on the way.
    pub async fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().await;
        while let Some(result) = set.try_join_next() {
            log_join_result(result);
        }
        set.spawn(async move {
            debug!("Background task '{}' started", name);
            task.await;
            debug!("Background task '{}' finished", name);
        });
    }

    /// Number of tasks not yet reaped
    pub async fn len(&self) -> usize {
        self.set.lock().await.len()
    }

    /// Whether no task is pending
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Wait for every pending task
    pub async fn join_all(&self) {
        let mut set = self.set.lock().await;
        if !set.is_empty() {
            info!("Waiting for {} background task(s)", set.len());
        }
        while let Some(result) = set.join_next().await {
            log_join_result(result);
        }
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Background task panicked: {}", e);
        } else {
            debug!("Background task cancelled: {}", e);
        }
    }
}
