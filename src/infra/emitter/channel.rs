//! Bounded channel emitter feeding the downstream poll executor.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::core::{FireNotification, NotificationEmitter, SchedulerError, SchedulerResult};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Hands notifications to a bounded tokio channel without waiting.
///
/// When the consumer falls behind and the channel is full the notification is
/// rejected rather than stalling dispatch.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::Sender<FireNotification>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver the consumer reads from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<FireNotification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Remaining free slots.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl NotificationEmitter for ChannelEmitter {
    fn emit(&self, notification: FireNotification) -> SchedulerResult<()> {
        self.tx.try_send(notification).map_err(|e| match e {
            TrySendError::Full(n) => {
                SchedulerError::Backend(format!("notification channel full; dropped {}", n.data_source_id))
            }
            TrySendError::Closed(n) => SchedulerError::Backend(format!(
                "notification channel closed; dropped {}",
                n.data_source_id
            )),
        })
    }
}
