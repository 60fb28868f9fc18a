//! Tests for utility functions

use std::time::Duration;

use chrono::{TimeZone, Utc};
use polling_scheduler::util::{
    format_timespan, new_correlation_id, parse_timespan, Clock, KeyedLocks, ManualClock,
};

#[test]
fn test_timespan_round_trip_for_common_intervals() {
    for secs in [1, 59, 60, 300, 3_600, 86_400] {
        let d = Duration::from_secs(secs);
        assert_eq!(parse_timespan(&format_timespan(d)), Ok(d));
    }
}

#[test]
fn test_timespan_day_form() {
    assert_eq!(format_timespan(Duration::from_secs(90_000)), "1.01:00:00");
    assert_eq!(parse_timespan("2.00:00:00"), Ok(Duration::from_secs(172_800)));
}

#[test]
fn test_timespan_overflow_is_an_error() {
    assert!(parse_timespan("999999999999999999.00:00:00").is_err());
    assert!(parse_timespan("213503982334601.07:00:16").is_err());
    assert_eq!(
        parse_timespan("10000.00:00:00"),
        Ok(Duration::from_secs(864_000_000))
    );
}

#[test]
fn test_correlation_id_is_uuid() {
    let id = new_correlation_id();
    assert_eq!(id.len(), 36);
    assert!(uuid_like(&id));
}

fn uuid_like(id: &str) -> bool {
    id.split('-').map(str::len).collect::<Vec<_>>() == vec![8, 4, 4, 4, 12]
}

#[test]
fn test_manual_clock() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    clock.advance(chrono::Duration::minutes(5));
    assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap());
}

#[tokio::test]
async fn test_keyed_locks_prune_after_release() {
    let locks = KeyedLocks::new();
    let permit = locks.acquire("ds-1").await.unwrap();
    let _other = locks.acquire("ds-2").await.unwrap();
    assert_eq!(locks.len(), 2);

    drop(permit);
    locks.prune_idle();
    assert_eq!(locks.len(), 1);
}
