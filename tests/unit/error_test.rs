//! Tests for error types

use polling_scheduler::core::{CronExpression, ErrorKind, SchedulerError};

#[test]
fn test_not_found_error() {
    let err = SchedulerError::NotFound("ds-1".to_string());
    assert_eq!(format!("{}", err), "no schedule found for data source ds-1");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!err.is_retryable());
}

#[test]
fn test_already_scheduled_error() {
    let err = SchedulerError::AlreadyScheduled("ds-1".to_string());
    assert_eq!(format!("{}", err), "data source ds-1 is already scheduled");
    assert_eq!(err.kind(), ErrorKind::AlreadyScheduled);
}

#[test]
fn test_persistence_failure_is_retryable() {
    let err = SchedulerError::PersistenceFailure("disk full".to_string());
    assert_eq!(format!("{}", err), "persistence failure: disk full");
    assert!(err.is_retryable());
}

#[test]
fn test_partial_reconciliation_error() {
    let err = SchedulerError::ReconciliationPartialFailure {
        succeeded: 3,
        failed: 1,
    };
    assert_eq!(
        format!("{}", err),
        "reconciliation partially failed: 3 restored, 1 failed"
    );
    assert_eq!(err.kind(), ErrorKind::ReconciliationPartialFailure);
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
    assert!(err.is_retryable());
}

#[test]
fn test_cron_error_becomes_invalid_configuration() {
    let err: SchedulerError = CronExpression::parse("0 0 25 * * ?").unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    assert!(err.to_string().contains("0 0 25 * * ?"));
}

#[test]
fn test_error_kind_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&ErrorKind::InvalidConfiguration).unwrap(),
        "\"invalid_configuration\""
    );
}
