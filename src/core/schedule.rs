//! Schedule data model: durable records, live jobs, and status snapshots.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cron::CronExpression;
use crate::util::serde::{new_correlation_id, timespan, CorrelationId, DataSourceId};

/// Supplier name used when a request leaves it blank.
pub const UNKNOWN_SUPPLIER: &str = "Unknown";

/// Durable schedule definition, owned by the schedule store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    /// Unique key; one schedule per data source.
    pub data_source_id: DataSourceId,
    /// Display name of the data source.
    pub data_source_name: String,
    /// Display name of the supplier.
    pub supplier_name: String,
    /// Authoritative seconds-resolution cron expression.
    pub cron_expression: String,
    /// Informational polling interval.
    #[serde(with = "timespan")]
    pub polling_interval: Duration,
    /// False means logically deleted.
    pub is_active: bool,
    /// True means registered but not firing.
    pub is_paused: bool,
    /// Best-effort cache of the next fire instant.
    pub next_execution_time: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Correlation id of the request that last mutated the record.
    pub correlation_id: CorrelationId,
}

impl ScheduleRecord {
    /// New active, unpaused record. The display name defaults to the id and
    /// the supplier to [`UNKNOWN_SUPPLIER`].
    pub fn new(
        data_source_id: impl Into<DataSourceId>,
        cron_expression: impl Into<String>,
        polling_interval: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let data_source_id = data_source_id.into();
        Self {
            data_source_name: data_source_id.clone(),
            data_source_id,
            supplier_name: UNKNOWN_SUPPLIER.to_string(),
            cron_expression: cron_expression.into(),
            polling_interval,
            is_active: true,
            is_paused: false,
            next_execution_time: None,
            created_at: now,
            updated_at: now,
            correlation_id: new_correlation_id(),
        }
    }

    /// Set display metadata.
    #[must_use]
    pub fn with_names(
        mut self,
        data_source_name: impl Into<String>,
        supplier_name: impl Into<String>,
    ) -> Self {
        self.data_source_name = data_source_name.into();
        let supplier = supplier_name.into();
        self.supplier_name = if supplier.trim().is_empty() {
            UNKNOWN_SUPPLIER.to_string()
        } else {
            supplier
        };
        self
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Whether reconciliation should restore this record.
    pub const fn is_restorable(&self) -> bool {
        self.is_active && !self.is_paused
    }
}

/// Live job state. A deleted job has no live entry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Armed in the dispatch queue.
    Active,
    /// Registered but not firing.
    Paused,
}

/// In-memory, currently armed representation of a schedule.
#[derive(Debug, Clone)]
pub struct LiveJob {
    /// Key shared with the durable record.
    pub data_source_id: DataSourceId,
    /// Display name carried into notifications.
    pub data_source_name: String,
    /// Supplier carried into notifications.
    pub supplier_name: String,
    /// Parsed cron expression.
    pub cron: CronExpression,
    /// Informational polling interval.
    pub polling_interval: Duration,
    /// Active or paused.
    pub state: JobState,
    /// Dispatch ordering key; `None` while paused.
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Last time a fire notification was emitted.
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Scheduled fires so far; manual triggers are not counted.
    pub firing_count: u64,
    /// Correlation id of the last mutation.
    pub correlation_id: CorrelationId,
}

impl LiveJob {
    /// Snapshot for callers.
    pub fn status(&self) -> ScheduleStatus {
        ScheduleStatus {
            data_source_id: self.data_source_id.clone(),
            data_source_name: self.data_source_name.clone(),
            supplier_name: self.supplier_name.clone(),
            cron_expression: self.cron.as_str().to_string(),
            polling_interval: self.polling_interval,
            state: self.state,
            is_paused: self.state == JobState::Paused,
            last_fired_at: self.last_fired_at,
            next_fire_at: self.next_fire_at,
            firing_count: self.firing_count,
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Copy live state onto a durable record.
    pub fn apply_to(&self, record: &mut ScheduleRecord, now: DateTime<Utc>) {
        record.data_source_name.clone_from(&self.data_source_name);
        record.supplier_name.clone_from(&self.supplier_name);
        record.cron_expression = self.cron.as_str().to_string();
        record.polling_interval = self.polling_interval;
        record.is_active = true;
        record.is_paused = self.state == JobState::Paused;
        record.next_execution_time = self.next_fire_at;
        record.correlation_id.clone_from(&self.correlation_id);
        record.updated_at = now;
    }
}

/// Point-in-time view of a live job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    /// Data source key.
    pub data_source_id: DataSourceId,
    /// Display name.
    pub data_source_name: String,
    /// Supplier name.
    pub supplier_name: String,
    /// Current cron expression.
    pub cron_expression: String,
    /// Informational polling interval.
    #[serde(with = "timespan")]
    pub polling_interval: Duration,
    /// Active or paused.
    pub state: JobState,
    /// Mirror of `state == Paused`.
    pub is_paused: bool,
    /// Last fire instant, if any.
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Next fire instant; `None` while paused.
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Number of fires so far.
    pub firing_count: u64,
    /// Correlation id of the last mutation.
    pub correlation_id: CorrelationId,
}
