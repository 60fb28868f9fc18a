//! Durable schedule store boundary.

use async_trait::async_trait;

use crate::core::schedule::ScheduleRecord;
use crate::core::SchedulerResult;

/// Durable CRUD over schedule records, keyed by `data_source_id`.
///
/// Implementations keep at most one record per id. Errors are reported as
/// [`crate::core::SchedulerError::Backend`]; the scheduler maps them to
/// `PersistenceFailure`.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Insert a record, replacing any existing record with the same id.
    async fn create(&self, record: &ScheduleRecord) -> SchedulerResult<()>;

    /// Overwrite an existing record. Returns `false` and writes nothing when
    /// no record exists for the id.
    async fn update(&self, record: &ScheduleRecord) -> SchedulerResult<bool>;

    /// Remove the record. Returns whether one existed.
    async fn delete(&self, data_source_id: &str) -> SchedulerResult<bool>;

    /// Fetch one record.
    async fn get(&self, data_source_id: &str) -> SchedulerResult<Option<ScheduleRecord>>;

    /// Records with `is_active && !is_paused`.
    async fn list_active(&self) -> SchedulerResult<Vec<ScheduleRecord>>;
}
