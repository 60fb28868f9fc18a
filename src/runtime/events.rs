//! Data-source lifecycle events and how they map onto schedule operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{
    effective_cron_expression, PollingScheduler, ScheduleRecord, ScheduleStatus, SchedulerError,
    SchedulerResult,
};
use crate::util::serde::{timespan, CorrelationId, DataSourceId};

/// Data-source fields carried by created/updated events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceChange {
    /// Data source key.
    pub data_source_id: DataSourceId,
    /// Display name.
    pub data_source_name: String,
    /// Supplier name.
    #[serde(default)]
    pub supplier_name: String,
    /// Polling interval.
    #[serde(with = "timespan")]
    pub polling_rate: Duration,
    /// Explicit cron; derived from the interval when absent or blank.
    #[serde(default)]
    pub cron_expression: Option<String>,
    /// Inactive sources are not scheduled.
    pub is_active: bool,
}

impl DataSourceChange {
    /// Cron expression to schedule with.
    pub fn effective_cron(&self) -> String {
        self.cron_expression
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map_or_else(|| effective_cron_expression(self.polling_rate), str::to_string)
    }

    /// Schedule record for this change.
    pub fn to_record(&self, now: chrono::DateTime<chrono::Utc>, correlation_id: &str) -> ScheduleRecord {
        ScheduleRecord::new(
            self.data_source_id.clone(),
            self.effective_cron(),
            self.polling_rate,
            now,
        )
        .with_names(self.data_source_name.clone(), self.supplier_name.clone())
        .with_correlation_id(correlation_id)
    }
}

/// Lifecycle event published by the data-source registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSourceEvent {
    /// A data source was registered.
    Created {
        /// New state.
        #[serde(flatten)]
        change: DataSourceChange,
        /// Tracing token.
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
    },
    /// A data source was edited.
    Updated {
        /// New state.
        #[serde(flatten)]
        change: DataSourceChange,
        /// Tracing token.
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
    },
    /// A data source was removed.
    Deleted {
        /// Removed data source.
        #[serde(rename = "dataSourceId")]
        data_source_id: DataSourceId,
        /// Tracing token.
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
    },
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The source is scheduled with this status.
    Scheduled(ScheduleStatus),
    /// The source was unscheduled; `removed` tells whether anything existed.
    Unscheduled {
        /// Whether a live job or record was removed.
        removed: bool,
    },
    /// Nothing to do (e.g. an inactive source was created).
    Ignored,
}

/// Apply one lifecycle event.
///
/// Created and active schedules the source, replacing any leftover schedule.
/// Updated and inactive unschedules it. Updated and active replaces the
/// schedule. Deleted unschedules it.
pub async fn handle_event(
    scheduler: &PollingScheduler,
    event: DataSourceEvent,
) -> SchedulerResult<EventOutcome> {
    match event {
        DataSourceEvent::Created {
            change,
            correlation_id,
        } => {
            if !change.is_active {
                tracing::info!(data_source_id = %change.data_source_id, %correlation_id, "inactive source created; not scheduling");
                return Ok(EventOutcome::Ignored);
            }
            let record = change.to_record(scheduler.now(), &correlation_id);
            match scheduler.schedule(record.clone()).await {
                Err(SchedulerError::AlreadyScheduled(_)) => {
                    scheduler.reschedule(record).await.map(EventOutcome::Scheduled)
                }
                other => other.map(EventOutcome::Scheduled),
            }
        }
        DataSourceEvent::Updated {
            change,
            correlation_id,
        } => {
            if change.is_active {
                let record = change.to_record(scheduler.now(), &correlation_id);
                scheduler.reschedule(record).await.map(EventOutcome::Scheduled)
            } else {
                tracing::info!(data_source_id = %change.data_source_id, %correlation_id, "source deactivated; unscheduling");
                scheduler
                    .unschedule(&change.data_source_id)
                    .await
                    .map(|removed| EventOutcome::Unscheduled { removed })
            }
        }
        DataSourceEvent::Deleted {
            data_source_id,
            correlation_id,
        } => {
            tracing::info!(%data_source_id, %correlation_id, "source deleted; unscheduling");
            scheduler
                .unschedule(&data_source_id)
                .await
                .map(|removed| EventOutcome::Unscheduled { removed })
        }
    }
}
