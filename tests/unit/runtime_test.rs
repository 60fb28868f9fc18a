//! Tests for the administrative API surface

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use polling_scheduler::core::{
    ErrorKind, InMemorySink, JobState, PollingScheduler, SchedulerOptions,
};
use polling_scheduler::infra::{InMemoryEmitter, InMemoryStore};
use polling_scheduler::runtime::api;
use polling_scheduler::runtime::{ScheduleRequest, UpdateScheduleRequest};
use polling_scheduler::util::ManualClock;

fn scheduler() -> PollingScheduler {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    PollingScheduler::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryEmitter::new()),
        Arc::new(InMemorySink::new(16)),
        Arc::new(ManualClock::new(now)),
        SchedulerOptions::default(),
    )
}

fn request(id: &str) -> ScheduleRequest {
    ScheduleRequest {
        data_source_id: id.to_string(),
        data_source_name: "Orders".to_string(),
        supplier_name: None,
        cron_expression: None,
        polling_interval: Duration::from_secs(300),
        correlation_id: Some("corr-1".to_string()),
    }
}

#[tokio::test]
async fn test_schedule_derives_cron_and_defaults_supplier() {
    let s = scheduler();
    let resp = api::schedule(&s, request("ds-1")).await;
    assert!(resp.success, "{}", resp.message);
    assert_eq!(resp.correlation_id, "corr-1");
    let schedule = resp.schedule.unwrap();
    assert_eq!(schedule.cron_expression, "0 */5 * * * *");
    assert_eq!(schedule.supplier_name, "Unknown");
}

#[tokio::test]
async fn test_schedule_twice_reports_kind() {
    let s = scheduler();
    api::schedule(&s, request("ds-1")).await;
    let resp = api::schedule(&s, request("ds-1")).await;
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::AlreadyScheduled));
    assert!(resp.schedule.is_none());
}

#[tokio::test]
async fn test_missing_correlation_id_is_generated() {
    let s = scheduler();
    let resp = api::pause(&s, "ghost", None).await;
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::NotFound));
    assert_eq!(resp.correlation_id.len(), 36);

    let resp = api::status(&s, "ghost", Some("  ".to_string()));
    assert_ne!(resp.correlation_id.trim(), "");
}

#[tokio::test]
async fn test_update_needs_a_field() {
    let s = scheduler();
    api::schedule(&s, request("ds-1")).await;
    let resp = api::update_schedule(&s, "ds-1", UpdateScheduleRequest::default()).await;
    assert!(!resp.success);
    assert_eq!(resp.error_kind, Some(ErrorKind::InvalidConfiguration));
}

#[tokio::test]
async fn test_update_interval_only_rederives_cron() {
    let s = scheduler();
    api::schedule(&s, request("ds-1")).await;
    let resp = api::update_schedule(
        &s,
        "ds-1",
        UpdateScheduleRequest {
            new_polling_interval: Some(Duration::from_secs(7_200)),
            ..UpdateScheduleRequest::default()
        },
    )
    .await;
    assert!(resp.success, "{}", resp.message);
    let schedule = resp.schedule.unwrap();
    assert_eq!(schedule.cron_expression, "0 0 */2 * * *");
    assert_eq!(schedule.polling_interval, Duration::from_secs(7_200));
}

#[tokio::test]
async fn test_update_cron_only_keeps_interval() {
    let s = scheduler();
    api::schedule(&s, request("ds-1")).await;
    let resp = api::update_schedule(
        &s,
        "ds-1",
        UpdateScheduleRequest {
            cron_expression: Some("0 15 * * * ?".into()),
            ..UpdateScheduleRequest::default()
        },
    )
    .await;
    let schedule = resp.schedule.unwrap();
    assert_eq!(schedule.cron_expression, "0 15 * * * ?");
    assert_eq!(schedule.polling_interval, Duration::from_secs(300));
}

#[tokio::test]
async fn test_pause_resume_trigger_and_unschedule() {
    let s = scheduler();
    api::schedule(&s, request("ds-1")).await;

    let resp = api::pause(&s, "ds-1", None).await;
    assert_eq!(resp.schedule.unwrap().state, JobState::Paused);
    let resp = api::trigger_now(&s, "ds-1", Some("manual".into())).await;
    assert!(resp.success);
    assert_eq!(resp.correlation_id, "manual");
    let resp = api::resume(&s, "ds-1", None).await;
    assert_eq!(resp.schedule.unwrap().state, JobState::Active);

    let resp = api::unschedule(&s, "ds-1", None).await;
    assert!(resp.success);
    let resp = api::unschedule(&s, "ds-1", None).await;
    assert!(resp.success);
    assert!(resp.message.contains("was not scheduled"));
    assert!(api::list_schedules(&s).is_empty());
}

#[tokio::test]
async fn test_health_reflects_dispatch_and_counts() {
    let s = scheduler();
    api::schedule(&s, request("ds-1")).await;
    api::schedule(&s, request("ds-2")).await;
    api::pause(&s, "ds-2", None).await;

    let health = api::health(&s);
    assert!(!health.ok);
    assert_eq!((health.active_jobs, health.paused_jobs), (1, 1));

    s.start();
    assert!(api::health(&s).ok);
    s.shutdown().await;
}

#[test]
fn test_request_json_shape() {
    let req: ScheduleRequest = serde_json::from_str(
        r#"{"dataSourceId":"ds-1","dataSourceName":"Orders","pollingInterval":"00:10:00"}"#,
    )
    .unwrap();
    assert_eq!(req.polling_interval, Duration::from_secs(600));
    assert!(req.correlation_id.is_none());

    let upd: UpdateScheduleRequest =
        serde_json::from_str(r#"{"newPollingInterval":"01:00:00"}"#).unwrap();
    assert_eq!(upd.new_polling_interval, Some(Duration::from_secs(3_600)));
}
