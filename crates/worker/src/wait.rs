//! Background work that outlives the request that started it.
//!
//! Strategies hand off cache writes here so the response can be returned
//! immediately. Hosts and tests call [`WaitUntil::settle`] to observe the
//! writes.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Tracker for spawned background tasks.
#[derive(Clone, Default)]
pub struct WaitUntil {
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the runtime and track it until it completes.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Number of tasks that have not completed yet.
    pub fn pending(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Await every task spawned so far, including ones spawned while settling.
    pub async fn settle(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *pending)
            };
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    tracing::warn!("background task failed: {}", e);
                }
            }
        }
    }
}

impl std::fmt::Debug for WaitUntil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitUntil").field("pending", &self.pending()).finish()
    }
}
