//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use polling_scheduler::builders::{build_scheduler, build_store, start_scheduler};
use polling_scheduler::config::{SchedulerConfig, StoreBackendConfig};
use polling_scheduler::core::{InMemorySink, ScheduleRecord, SchedulerOptions};
use polling_scheduler::infra::{InMemoryEmitter, InMemoryStore};
use polling_scheduler::util::{ManualClock, SystemClock};

fn record(id: &str, cron: &str) -> ScheduleRecord {
    ScheduleRecord::new(id, cron, Duration::from_secs(60), Utc::now())
}

#[tokio::test]
async fn test_build_in_memory_store() {
    let store = build_store(&StoreBackendConfig::InMemory).unwrap();
    assert!(store.list_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_build_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_store(&StoreBackendConfig::File {
        path: dir.path().to_path_buf(),
        stream: "jobs".into(),
    })
    .unwrap();
    store.create(&record("ds-1", "0 * * * * ?")).await.unwrap();
    assert!(dir.path().join("jobs.jsonl").exists());
}

#[tokio::test]
async fn test_start_scheduler_reconciles_before_dispatch() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let store = Arc::new(InMemoryStore::with_records([
        record("ds-1", "0 * * * * ?"),
        record("bad", "nope"),
    ]));
    let (scheduler, report) = start_scheduler(
        store,
        Arc::new(InMemoryEmitter::new()),
        Arc::new(InMemorySink::new(16)),
        Arc::new(ManualClock::new(now)),
        SchedulerOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.failed.len(), 1);
    assert!(scheduler.is_dispatch_running());
    assert!(scheduler.status("ds-1").is_ok());
    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_build_scheduler_restores_from_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SchedulerConfig {
        store: StoreBackendConfig::File {
            path: dir.path().to_path_buf(),
            stream: "schedules".into(),
        },
        ..SchedulerConfig::default()
    };

    let first = build_scheduler(&cfg, Arc::new(InMemorySink::new(16)), Arc::new(SystemClock))
        .await
        .unwrap();
    first
        .scheduler
        .schedule(record("ds-1", "0 0 * * * ?"))
        .await
        .unwrap();
    first.scheduler.shutdown().await;
    drop(first);

    let second = build_scheduler(&cfg, Arc::new(InMemorySink::new(16)), Arc::new(SystemClock))
        .await
        .unwrap();
    assert_eq!(second.report.restored, 1);
    assert!(second.scheduler.status("ds-1").is_ok());
    second.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_build_scheduler_rejects_invalid_config() {
    let mut cfg = SchedulerConfig::default();
    cfg.guard_rails.min_interval_secs = 0;
    let result = build_scheduler(&cfg, Arc::new(InMemorySink::new(1)), Arc::new(SystemClock)).await;
    assert!(result.is_err());
}
