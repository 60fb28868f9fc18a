//! Startup recovery: rebuild live jobs from durable records.
//!
//! Runs once before administrative traffic is accepted. Only records with
//! `is_active && !is_paused` are restored, so pausing survives restarts.
//! Individual failures are collected and never abort the batch.

use serde::{Deserialize, Serialize};

use crate::core::observability::ReconciliationCounts;
use crate::core::scheduler::{PollingScheduler, RestoreOutcome};
use crate::core::{SchedulerError, SchedulerResult};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Restorable records read from the store.
    pub total: usize,
    /// Records registered as live jobs.
    pub restored: usize,
    /// Records whose id was already live.
    pub skipped_existing: usize,
    /// Restored ids whose refreshed fire time could not be written back.
    pub unpersisted: Vec<String>,
    /// `(data_source_id, reason)` for records that failed to parse or register.
    pub failed: Vec<(String, String)>,
}

impl ReconciliationReport {
    /// True when no record failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Totals for the observability sink.
    pub fn counts(&self) -> ReconciliationCounts {
        ReconciliationCounts {
            total: self.total,
            restored: self.restored,
            skipped: self.skipped_existing,
            failed: self.failed.len(),
        }
    }

    /// `ReconciliationPartialFailure` if any record failed, else the report.
    pub fn into_result(self) -> SchedulerResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(SchedulerError::ReconciliationPartialFailure {
                succeeded: self.restored + self.skipped_existing,
                failed: self.failed.len(),
            })
        }
    }
}

/// Restore every active, unpaused record into `scheduler`.
///
/// Fails only when the store cannot be listed. Running it again against the
/// same store state restores nothing new.
pub async fn reconcile(scheduler: &PollingScheduler) -> SchedulerResult<ReconciliationReport> {
    let records = scheduler.load_restorable().await.map_err(|e| {
        tracing::error!(error = %e, "could not list schedule records");
        e
    })?;

    let mut report = ReconciliationReport {
        total: records.len(),
        ..ReconciliationReport::default()
    };
    tracing::info!(total = report.total, "reconciling schedules");

    for record in records {
        let id = record.data_source_id.clone();
        match scheduler.restore(record).await {
            Ok(RestoreOutcome::Restored { persisted }) => {
                report.restored += 1;
                if !persisted {
                    report.unpersisted.push(id);
                }
            }
            Ok(RestoreOutcome::AlreadyLive) => {
                tracing::debug!(data_source_id = %id, "already live; skipped");
                report.skipped_existing += 1;
            }
            Err(e) => {
                tracing::warn!(data_source_id = %id, error = %e, "schedule not restored");
                report.failed.push((id, e.to_string()));
            }
        }
    }

    if report.is_complete() {
        tracing::info!(
            restored = report.restored,
            skipped = report.skipped_existing,
            "reconciliation finished"
        );
    } else {
        tracing::warn!(
            restored = report.restored,
            skipped = report.skipped_existing,
            failed = report.failed.len(),
            "reconciliation finished with failures"
        );
    }
    scheduler.report_reconciliation(report.counts());
    Ok(report)
}
