//! API-facing request/response models.
//!
//! A transport layer (HTTP, RPC, queue consumer) deserializes requests,
//! calls these functions, and serializes the [`OperationResponse`]. Nothing
//! here returns an error: failures become `success: false` with an
//! [`ErrorKind`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{
    effective_cron_expression, ErrorKind, FireNotification, PollingScheduler, ScheduleRecord,
    ScheduleStatus, SchedulerError, SchedulerResult,
};
use crate::util::serde::{new_correlation_id, timespan, timespan_opt, CorrelationId, DataSourceId};

/// Create-schedule payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    /// Data source key.
    pub data_source_id: DataSourceId,
    /// Display name.
    pub data_source_name: String,
    /// Supplier; blank becomes `Unknown`.
    #[serde(default)]
    pub supplier_name: Option<String>,
    /// Explicit cron; derived from the interval when absent.
    #[serde(default)]
    pub cron_expression: Option<String>,
    /// Polling interval.
    #[serde(with = "timespan")]
    pub polling_interval: Duration,
    /// Caller-supplied correlation id; generated when absent.
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

/// Update-schedule payload. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    /// Replacement cron expression.
    #[serde(default)]
    pub cron_expression: Option<String>,
    /// Replacement interval. Without a cron, the cron is derived from it.
    #[serde(default, with = "timespan_opt")]
    pub new_polling_interval: Option<Duration>,
    /// Caller-supplied correlation id; generated when absent.
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
}

/// Uniform operation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Correlation id of this request.
    pub correlation_id: CorrelationId,
    /// Failure kind, when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Schedule after the operation, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleStatus>,
}

impl OperationResponse {
    fn ok(message: String, correlation_id: CorrelationId, schedule: Option<ScheduleStatus>) -> Self {
        Self {
            success: true,
            message,
            correlation_id,
            error_kind: None,
            schedule,
        }
    }

    fn failed(err: &SchedulerError, correlation_id: CorrelationId) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            correlation_id,
            error_kind: Some(err.kind()),
            schedule: None,
        }
    }

    fn from_result<T>(
        result: SchedulerResult<T>,
        correlation_id: CorrelationId,
        on_ok: impl FnOnce(T) -> (String, Option<ScheduleStatus>),
    ) -> Self {
        match result {
            Ok(value) => {
                let (message, schedule) = on_ok(value);
                Self::ok(message, correlation_id, schedule)
            }
            Err(e) => Self::failed(&e, correlation_id),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Healthy flag: the dispatch loop is running.
    pub ok: bool,
    /// Dispatch loop state.
    pub dispatch_running: bool,
    /// Live jobs currently firing.
    pub active_jobs: usize,
    /// Live jobs currently paused.
    pub paused_jobs: usize,
}

fn correlation_or_new(correlation_id: Option<CorrelationId>) -> CorrelationId {
    correlation_id
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(new_correlation_id)
}

/// Schedule polling for a data source.
pub async fn schedule(scheduler: &PollingScheduler, req: ScheduleRequest) -> OperationResponse {
    let correlation_id = correlation_or_new(req.correlation_id);
    let cron = req
        .cron_expression
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| effective_cron_expression(req.polling_interval));
    let record = ScheduleRecord::new(
        req.data_source_id.clone(),
        cron,
        req.polling_interval,
        scheduler.now(),
    )
    .with_names(req.data_source_name, req.supplier_name.unwrap_or_default())
    .with_correlation_id(correlation_id.clone());

    let id = req.data_source_id;
    OperationResponse::from_result(scheduler.schedule(record).await, correlation_id, |status| {
        (format!("Scheduled polling for data source {id}"), Some(status))
    })
}

/// Change the cron expression and/or interval of a schedule.
pub async fn update_schedule(
    scheduler: &PollingScheduler,
    data_source_id: &str,
    req: UpdateScheduleRequest,
) -> OperationResponse {
    let correlation_id = correlation_or_new(req.correlation_id);
    let cron_override = req.cron_expression.filter(|c| !c.trim().is_empty());
    if cron_override.is_none() && req.new_polling_interval.is_none() {
        let err = SchedulerError::InvalidConfiguration(
            "update needs a cron expression or a polling interval".into(),
        );
        return OperationResponse::failed(&err, correlation_id);
    }

    let current = match scheduler.status(data_source_id) {
        Ok(status) => status,
        Err(e) => return OperationResponse::failed(&e, correlation_id),
    };
    let interval = req.new_polling_interval.unwrap_or(current.polling_interval);
    let cron = match (cron_override, req.new_polling_interval) {
        (Some(cron), _) => cron,
        (None, Some(interval)) => effective_cron_expression(interval),
        (None, None) => current.cron_expression,
    };

    let result = scheduler
        .update_interval(data_source_id, &cron, interval, Some(&correlation_id))
        .await;
    OperationResponse::from_result(result, correlation_id, |status| {
        (
            format!("Updated schedule for data source {data_source_id}"),
            Some(status),
        )
    })
}

/// Remove a schedule.
pub async fn unschedule(
    scheduler: &PollingScheduler,
    data_source_id: &str,
    correlation_id: Option<CorrelationId>,
) -> OperationResponse {
    let correlation_id = correlation_or_new(correlation_id);
    OperationResponse::from_result(
        scheduler.unschedule(data_source_id).await,
        correlation_id,
        |removed| {
            let message = if removed {
                format!("Unscheduled data source {data_source_id}")
            } else {
                format!("Data source {data_source_id} was not scheduled")
            };
            (message, None)
        },
    )
}

/// Pause a schedule.
pub async fn pause(
    scheduler: &PollingScheduler,
    data_source_id: &str,
    correlation_id: Option<CorrelationId>,
) -> OperationResponse {
    let correlation_id = correlation_or_new(correlation_id);
    OperationResponse::from_result(
        scheduler.pause(data_source_id).await,
        correlation_id,
        |status| (format!("Paused data source {data_source_id}"), Some(status)),
    )
}

/// Resume a schedule.
pub async fn resume(
    scheduler: &PollingScheduler,
    data_source_id: &str,
    correlation_id: Option<CorrelationId>,
) -> OperationResponse {
    let correlation_id = correlation_or_new(correlation_id);
    OperationResponse::from_result(
        scheduler.resume(data_source_id).await,
        correlation_id,
        |status| (format!("Resumed data source {data_source_id}"), Some(status)),
    )
}

/// Fire a data source immediately.
pub async fn trigger_now(
    scheduler: &PollingScheduler,
    data_source_id: &str,
    correlation_id: Option<CorrelationId>,
) -> OperationResponse {
    let correlation_id = correlation_or_new(correlation_id);
    let result = scheduler
        .trigger_now(data_source_id, Some(&correlation_id))
        .await;
    let status = scheduler.status(data_source_id).ok();
    OperationResponse::from_result(result, correlation_id, |fired: FireNotification| {
        (
            format!("Triggered data source {} at {}", fired.data_source_id, fired.fired_at),
            status,
        )
    })
}

/// Fetch one schedule.
pub fn status(
    scheduler: &PollingScheduler,
    data_source_id: &str,
    correlation_id: Option<CorrelationId>,
) -> OperationResponse {
    let correlation_id = correlation_or_new(correlation_id);
    OperationResponse::from_result(scheduler.status(data_source_id), correlation_id, |status| {
        (format!("Schedule for data source {data_source_id}"), Some(status))
    })
}

/// Every live schedule.
pub fn list_schedules(scheduler: &PollingScheduler) -> Vec<ScheduleStatus> {
    scheduler.list_all()
}

/// Return a health payload.
pub fn health(scheduler: &PollingScheduler) -> Health {
    let dispatch_running = scheduler.is_dispatch_running();
    let (active_jobs, paused_jobs) = scheduler.job_counts();
    Health {
        ok: dispatch_running,
        dispatch_running,
        active_jobs,
        paused_jobs,
    }
}
