//! Per-key operation locks.
//!
//! Each key maps to a `Semaphore(1)`. Holding the permit gives exclusive
//! access to that key for the whole operation, including awaited I/O, while
//! other keys proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::SchedulerError;

/// Map of key to single-permit semaphore.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl KeyedLocks {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the permit drops.
    pub async fn acquire(&self, key: &str) -> Result<OwnedSemaphorePermit, SchedulerError> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned()
            .await
            .map_err(|e| SchedulerError::Backend(format!("lock for {key} closed: {e}")))
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// True when no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    /// Drop semaphores nobody holds or waits on.
    pub fn prune_idle(&self) {
        // A held permit or a waiter keeps a second reference alive.
        self.locks.lock().retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}
