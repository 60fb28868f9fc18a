//! In-memory emitter that records every notification.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::{FireNotification, NotificationEmitter, SchedulerResult};

/// Collects notifications for inspection.
#[derive(Debug, Default)]
pub struct InMemoryEmitter {
    notifications: Mutex<Vec<FireNotification>>,
}

impl InMemoryEmitter {
    /// Create an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification so far, in emission order.
    pub fn notifications(&self) -> Vec<FireNotification> {
        self.notifications.lock().clone()
    }

    /// Notifications for one data source, optionally since an instant.
    pub fn fetch(
        &self,
        data_source_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<FireNotification> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.data_source_id == data_source_id)
            .filter(|n| since.is_none_or(|s| n.fired_at >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of notifications for one data source.
    pub fn count_for(&self, data_source_id: &str) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.data_source_id == data_source_id)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

impl NotificationEmitter for InMemoryEmitter {
    fn emit(&self, notification: FireNotification) -> SchedulerResult<()> {
        self.notifications.lock().push(notification);
        Ok(())
    }
}
