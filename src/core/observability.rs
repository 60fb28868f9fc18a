//! Observability sink for lifecycle counters.
//!
//! Every administrative operation reports one [`OperationEvent`] tagged with
//! its outcome. The in-memory sink keeps a bounded event log plus counters,
//! the tracing sink turns events into log lines.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::util::clock::now_ms;

/// Counted lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `schedule_created`
    ScheduleCreated,
    /// `schedule_deleted`
    ScheduleDeleted,
    /// `schedule_updated`
    ScheduleUpdated,
    /// `schedule_paused`
    SchedulePaused,
    /// `schedule_resumed`
    ScheduleResumed,
    /// `manual_trigger`
    ManualTrigger,
}

impl Operation {
    /// Counter name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScheduleCreated => "schedule_created",
            Self::ScheduleDeleted => "schedule_deleted",
            Self::ScheduleUpdated => "schedule_updated",
            Self::SchedulePaused => "schedule_paused",
            Self::ScheduleResumed => "schedule_resumed",
            Self::ManualTrigger => "manual_trigger",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success/failure tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEvent {
    /// Data source the operation targeted.
    pub data_source_id: String,
    /// Which counter.
    pub operation: Operation,
    /// Success or failure.
    pub outcome: Outcome,
    /// Correlation id, when known.
    pub correlation_id: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Error text for failures.
    pub detail: Option<String>,
}

/// Startup recovery totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationCounts {
    /// Records read from the store.
    pub total: usize,
    /// Records registered as live jobs.
    pub restored: usize,
    /// Records already live.
    pub skipped: usize,
    /// Records that failed to parse or register.
    pub failed: usize,
}

/// Observability sink abstraction.
pub trait ObservabilitySink: Send + Sync {
    /// Record an operation outcome.
    fn record(&self, event: OperationEvent);

    /// Record a reconciliation summary.
    fn reconciliation(&self, _counts: ReconciliationCounts) {}
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn record(&self, event: OperationEvent) {
        info!(
            counter = event.operation.as_str(),
            outcome = ?event.outcome,
            data_source_id = %event.data_source_id,
            correlation_id = event.correlation_id.as_deref().unwrap_or(""),
            "operation recorded"
        );
    }

    fn reconciliation(&self, counts: ReconciliationCounts) {
        info!(
            total = counts.total,
            restored = counts.restored,
            skipped = counts.skipped,
            failed = counts.failed,
            "reconciliation recorded"
        );
    }
}

#[derive(Debug, Default)]
struct SinkState {
    events: VecDeque<OperationEvent>,
    counters: HashMap<(Operation, Outcome), u64>,
    last_reconciliation: Option<ReconciliationCounts>,
}

/// In-memory sink with a bounded event buffer; counters are never evicted.
#[derive(Debug)]
pub struct InMemorySink {
    state: Mutex<SinkState>,
    max_events: usize,
}

impl InMemorySink {
    /// Create a sink keeping at most `max_events` events.
    pub fn new(max_events: usize) -> Self {
        Self {
            state: Mutex::new(SinkState {
                events: VecDeque::with_capacity(max_events),
                ..SinkState::default()
            }),
            max_events,
        }
    }

    /// Snapshot of buffered events, oldest first.
    pub fn events(&self) -> Vec<OperationEvent> {
        self.state.lock().events.iter().cloned().collect()
    }

    /// Counter value.
    pub fn count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.state
            .lock()
            .counters
            .get(&(operation, outcome))
            .copied()
            .unwrap_or_default()
    }

    /// Most recent reconciliation summary.
    pub fn last_reconciliation(&self) -> Option<ReconciliationCounts> {
        self.state.lock().last_reconciliation
    }
}

impl ObservabilitySink for InMemorySink {
    fn record(&self, event: OperationEvent) {
        let mut state = self.state.lock();
        *state
            .counters
            .entry((event.operation, event.outcome))
            .or_default() += 1;
        if self.max_events == 0 {
            return;
        }
        if state.events.len() >= self.max_events {
            state.events.pop_front();
        }
        state.events.push_back(event);
    }

    fn reconciliation(&self, counts: ReconciliationCounts) {
        self.state.lock().last_reconciliation = Some(counts);
    }
}

/// Helper to build an operation event stamped with the current time.
pub fn build_operation_event(
    data_source_id: impl Into<String>,
    operation: Operation,
    outcome: Outcome,
    correlation_id: Option<String>,
    detail: Option<String>,
) -> OperationEvent {
    OperationEvent {
        data_source_id: data_source_id.into(),
        operation,
        outcome,
        correlation_id,
        created_at_ms: now_ms(),
        detail,
    }
}
