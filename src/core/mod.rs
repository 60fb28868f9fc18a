//! Core scheduling abstractions: cron engine, data model, registry, and the
//! scheduler with its recovery pass.

pub mod cron;
pub mod emitter;
pub mod error;
pub mod guard;
pub mod observability;
pub mod reconciler;
pub mod registry;
pub mod schedule;
pub mod scheduler;
pub mod store;

pub use cron::{next_fire_time, validate, CronError, CronExpression};
pub use emitter::{FireNotification, NotificationEmitter};
pub use error::{AppResult, ErrorKind, SchedulerError, SchedulerResult};
pub use guard::{effective_cron_expression, GuardRails};
pub use observability::{
    build_operation_event, InMemorySink, ObservabilitySink, Operation, OperationEvent, Outcome,
    ReconciliationCounts, TracingSink,
};
pub use reconciler::{reconcile, ReconciliationReport};
pub use schedule::{JobState, LiveJob, ScheduleRecord, ScheduleStatus, UNKNOWN_SUPPLIER};
pub use scheduler::{PollingScheduler, RestoreOutcome, SchedulerOptions};
pub use store::ScheduleStore;
