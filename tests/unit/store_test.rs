//! Tests for schedule store backends

use std::time::Duration;

use chrono::{TimeZone, Utc};
use polling_scheduler::core::{ScheduleRecord, ScheduleStore};
use polling_scheduler::infra::{FileScheduleStore, InMemoryStore};

fn record(id: &str) -> ScheduleRecord {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    ScheduleRecord::new(id, "0 */5 * * * ?", Duration::from_secs(300), now)
        .with_names("Orders", "Acme")
        .with_correlation_id("corr-1")
}

async fn exercise(store: &dyn ScheduleStore) {
    store.create(&record("a")).await.unwrap();
    store.create(&record("b")).await.unwrap();

    let mut paused = record("b");
    paused.is_paused = true;
    assert!(store.update(&paused).await.unwrap());
    assert!(!store.update(&record("ghost")).await.unwrap());
    assert!(store.get("ghost").await.unwrap().is_none());

    let active: Vec<String> = store
        .list_active()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.data_source_id)
        .collect();
    assert_eq!(active, vec!["a"]);

    assert!(store.delete("a").await.unwrap());
    assert!(!store.delete("a").await.unwrap());
    assert!(store.get("b").await.unwrap().unwrap().is_paused);
}

#[tokio::test]
async fn test_in_memory_store_contract() {
    let store = InMemoryStore::new();
    exercise(&store).await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_file_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileScheduleStore::new(dir.path(), "schedules").unwrap();
    exercise(&store).await;
    assert!(store.file_path().ends_with("schedules.jsonl"));
}

#[tokio::test]
async fn test_create_upserts() {
    let store = InMemoryStore::new();
    store.create(&record("a")).await.unwrap();
    let mut changed = record("a");
    changed.cron_expression = "0 0 * * * ?".into();
    store.create(&changed).await.unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.get("a").await.unwrap().unwrap().cron_expression,
        "0 0 * * * ?"
    );
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileScheduleStore::new(dir.path(), "schedules").unwrap();
        store.create(&record("a")).await.unwrap();
        store.create(&record("b")).await.unwrap();
        store.delete("b").await.unwrap();
    }

    let reopened = FileScheduleStore::new(dir.path(), "schedules").unwrap();
    let got = reopened.get("a").await.unwrap().unwrap();
    assert_eq!(got, record("a"));
    assert!(reopened.get("b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_store_lines_are_camel_case_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileScheduleStore::new(dir.path(), "schedules").unwrap();
    store.create(&record("a")).await.unwrap();

    let text = std::fs::read_to_string(store.file_path()).unwrap();
    let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(line["dataSourceId"], "a");
    assert_eq!(line["pollingInterval"], "00:05:00");
    assert_eq!(line["isPaused"], false);
}

#[tokio::test]
async fn test_file_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schedules.jsonl"), "{not json}\n").unwrap();
    assert!(FileScheduleStore::new(dir.path(), "schedules").is_err());
}
