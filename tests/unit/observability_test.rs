//! Tests for the observability sink

use polling_scheduler::core::{
    build_operation_event, InMemorySink, ObservabilitySink, Operation, Outcome,
    ReconciliationCounts,
};

#[test]
fn test_in_memory_sink() {
    let sink = InMemorySink::new(10);

    let event = build_operation_event(
        "ds-1",
        Operation::ScheduleCreated,
        Outcome::Success,
        Some("corr-1".to_string()),
        None,
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data_source_id, "ds-1");
    assert_eq!(events[0].operation, Operation::ScheduleCreated);
    assert_eq!(events[0].correlation_id.as_deref(), Some("corr-1"));
}

#[test]
fn test_sink_overflow_keeps_counters() {
    let sink = InMemorySink::new(2);

    for id in ["ds-1", "ds-2", "ds-3"] {
        sink.record(build_operation_event(id, Operation::SchedulePaused, Outcome::Success, None, None));
    }
    sink.record(build_operation_event(
        "ds-4",
        Operation::SchedulePaused,
        Outcome::Failure,
        None,
        Some("not found".into()),
    ));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data_source_id, "ds-3");
    assert_eq!(events[1].detail.as_deref(), Some("not found"));
    assert_eq!(sink.count(Operation::SchedulePaused, Outcome::Success), 3);
    assert_eq!(sink.count(Operation::SchedulePaused, Outcome::Failure), 1);
    assert_eq!(sink.count(Operation::ScheduleResumed, Outcome::Success), 0);
}

#[test]
fn test_build_operation_event() {
    let event = build_operation_event("ds-1", Operation::ManualTrigger, Outcome::Success, None, None);
    assert_eq!(event.operation.as_str(), "manual_trigger");
    assert_eq!(event.outcome, Outcome::Success);
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_counter_names() {
    let names: Vec<&str> = [
        Operation::ScheduleCreated,
        Operation::ScheduleDeleted,
        Operation::ScheduleUpdated,
        Operation::SchedulePaused,
        Operation::ScheduleResumed,
        Operation::ManualTrigger,
    ]
    .iter()
    .map(|op| op.as_str())
    .collect();
    assert_eq!(
        names,
        vec![
            "schedule_created",
            "schedule_deleted",
            "schedule_updated",
            "schedule_paused",
            "schedule_resumed",
            "manual_trigger",
        ]
    );
}

#[test]
fn test_reconciliation_summary() {
    let sink = InMemorySink::new(1);
    assert_eq!(sink.last_reconciliation(), None);
    let counts = ReconciliationCounts {
        total: 3,
        restored: 2,
        skipped: 0,
        failed: 1,
    };
    sink.reconciliation(counts);
    assert_eq!(sink.last_reconciliation(), Some(counts));
}
