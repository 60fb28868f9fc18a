//! Tests for notification emitters

use chrono::{TimeZone, Utc};
use polling_scheduler::core::{ErrorKind, FireNotification, NotificationEmitter};
use polling_scheduler::infra::{ChannelEmitter, InMemoryEmitter};

fn notification(id: &str, minute: u32) -> FireNotification {
    FireNotification {
        data_source_id: id.to_string(),
        data_source_name: format!("{id} name"),
        supplier_name: "Acme".to_string(),
        correlation_id: "corr".to_string(),
        fired_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, minute, 0).unwrap(),
        manual: false,
    }
}

#[tokio::test]
async fn test_channel_emitter_delivers() {
    let (emitter, mut rx) = ChannelEmitter::new(4);
    emitter.emit(notification("ds-1", 1)).unwrap();
    assert_eq!(rx.recv().await, Some(notification("ds-1", 1)));
}

#[test]
fn test_channel_emitter_full() {
    let (emitter, _rx) = ChannelEmitter::new(1);
    emitter.emit(notification("ds-1", 1)).unwrap();
    assert_eq!(emitter.capacity(), 0);
    let err = emitter.emit(notification("ds-1", 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().contains("full"));
}

#[test]
fn test_channel_emitter_closed() {
    let (emitter, rx) = ChannelEmitter::new(1);
    drop(rx);
    let err = emitter.emit(notification("ds-1", 1)).unwrap_err();
    assert!(err.to_string().contains("closed"));
}

#[test]
fn test_in_memory_emitter_fetch() {
    let emitter = InMemoryEmitter::new();
    for minute in 1..=4 {
        emitter.emit(notification("ds-1", minute)).unwrap();
    }
    emitter.emit(notification("ds-2", 5)).unwrap();

    assert_eq!(emitter.count_for("ds-1"), 4);
    let since = Utc.with_ymd_and_hms(2024, 6, 15, 12, 2, 0).unwrap();
    let fetched = emitter.fetch("ds-1", Some(since), 2);
    assert_eq!(fetched, vec![notification("ds-1", 2), notification("ds-1", 3)]);
    assert_eq!(emitter.fetch("ds-2", None, 10).len(), 1);

    emitter.clear();
    assert!(emitter.notifications().is_empty());
}

#[test]
fn test_notification_json_shape() {
    let json = serde_json::to_value(notification("ds-1", 1)).unwrap();
    assert_eq!(json["dataSourceId"], "ds-1");
    assert_eq!(json["supplierName"], "Acme");
    assert_eq!(json["manual"], false);
}
