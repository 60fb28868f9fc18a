//! Fire notification boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerResult;
use crate::util::serde::{CorrelationId, DataSourceId};

/// "Time to poll this data source" message handed downstream.
///
/// Delivery is at-least-once; consumers must handle duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireNotification {
    /// Data source to poll.
    pub data_source_id: DataSourceId,
    /// Display name.
    pub data_source_name: String,
    /// Supplier name.
    pub supplier_name: String,
    /// Tracing token.
    pub correlation_id: CorrelationId,
    /// Instant the scheduler fired.
    pub fired_at: DateTime<Utc>,
    /// True for out-of-band triggers.
    pub manual: bool,
}

/// Receives fire notifications from the scheduler.
///
/// `emit` is called from the dispatch path and must not block: hand the
/// notification off and return. A returned error is logged and counted; it
/// never stalls other jobs.
pub trait NotificationEmitter: Send + Sync {
    /// Hand off one notification.
    fn emit(&self, notification: FireNotification) -> SchedulerResult<()>;
}
