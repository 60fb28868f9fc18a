//! In-memory schedule store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{ScheduleRecord, ScheduleStore, SchedulerResult};

/// Schedule store backed by a map. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, ScheduleRecord>>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`, e.g. to simulate a restart.
    pub fn with_records(records: impl IntoIterator<Item = ScheduleRecord>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|r| (r.data_source_id.clone(), r))
                    .collect(),
            ),
        }
    }

    /// Snapshot of every record regardless of flags, ordered by id.
    pub fn records(&self) -> Vec<ScheduleRecord> {
        let mut all: Vec<ScheduleRecord> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.data_source_id.cmp(&b.data_source_id));
        all
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn create(&self, record: &ScheduleRecord) -> SchedulerResult<()> {
        self.records
            .write()
            .insert(record.data_source_id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &ScheduleRecord) -> SchedulerResult<bool> {
        let mut records = self.records.write();
        match records.get_mut(&record.data_source_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, data_source_id: &str) -> SchedulerResult<bool> {
        Ok(self.records.write().remove(data_source_id).is_some())
    }

    async fn get(&self, data_source_id: &str) -> SchedulerResult<Option<ScheduleRecord>> {
        Ok(self.records.read().get(data_source_id).cloned())
    }

    async fn list_active(&self) -> SchedulerResult<Vec<ScheduleRecord>> {
        let mut active: Vec<ScheduleRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.is_restorable())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.data_source_id.cmp(&b.data_source_id));
        Ok(active)
    }
}
