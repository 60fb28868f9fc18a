//! File-backed schedule store using JSON lines.
//!
//! One record per line in `<dir>/<stream>.jsonl`. The full set is held in
//! memory; every mutation rewrites the file through a temporary sibling and
//! a rename so a crash never leaves a half-written file behind.

use std::collections::BTreeMap;
use std::fs::{create_dir_all, rename, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{ScheduleRecord, ScheduleStore, SchedulerError, SchedulerResult};

/// Durable schedule store persisted as JSONL.
#[derive(Debug)]
pub struct FileScheduleStore {
    path: PathBuf,
    stream: String,
    records: Mutex<BTreeMap<String, ScheduleRecord>>,
}

impl FileScheduleStore {
    /// Open (or create) the store at `<path>/<stream>.jsonl`, loading any
    /// existing records.
    pub fn new(path: impl AsRef<Path>, stream: impl Into<String>) -> SchedulerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = stream.into();
        create_dir_all(&path).map_err(|e| SchedulerError::Backend(e.to_string()))?;
        let store = Self {
            path,
            stream,
            records: Mutex::new(BTreeMap::new()),
        };
        let loaded = store.load_from_disk()?;
        tracing::debug!(file = %store.file_path().display(), records = loaded.len(), "schedule file loaded");
        *store.records.lock() = loaded;
        Ok(store)
    }

    /// Location of the backing file.
    pub fn file_path(&self) -> PathBuf {
        self.path.join(format!("{}.jsonl", self.stream))
    }

    fn load_from_disk(&self) -> SchedulerResult<BTreeMap<String, ScheduleRecord>> {
        let file_path = self.file_path();
        let mut records = BTreeMap::new();
        if !file_path.exists() {
            return Ok(records);
        }
        let file = OpenOptions::new()
            .read(true)
            .open(&file_path)
            .map_err(|e| SchedulerError::Backend(e.to_string()))?;
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| SchedulerError::Backend(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ScheduleRecord = serde_json::from_str(&line).map_err(|e| {
                SchedulerError::Backend(format!("{}:{}: {e}", file_path.display(), idx + 1))
            })?;
            records.insert(record.data_source_id.clone(), record);
        }
        Ok(records)
    }

    fn rewrite_disk(&self, records: &BTreeMap<String, ScheduleRecord>) -> SchedulerResult<()> {
        let file_path = self.file_path();
        let tmp_path = self.path.join(format!("{}.jsonl.tmp", self.stream));
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| SchedulerError::Backend(e.to_string()))?;
            let mut writer = BufWriter::new(file);
            for record in records.values() {
                let line = serde_json::to_string(record)
                    .map_err(|e| SchedulerError::Backend(e.to_string()))?;
                writeln!(writer, "{line}").map_err(|e| SchedulerError::Backend(e.to_string()))?;
            }
            writer
                .flush()
                .map_err(|e| SchedulerError::Backend(e.to_string()))?;
        }
        rename(&tmp_path, &file_path).map_err(|e| SchedulerError::Backend(e.to_string()))
    }

    /// Apply `mutate` and persist. The in-memory set is only replaced once the
    /// file write succeeded.
    fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, ScheduleRecord>) -> T,
    ) -> SchedulerResult<T> {
        let mut records = self.records.lock();
        let mut next = records.clone();
        let out = mutate(&mut next);
        self.rewrite_disk(&next)?;
        *records = next;
        Ok(out)
    }
}

#[async_trait]
impl ScheduleStore for FileScheduleStore {
    async fn create(&self, record: &ScheduleRecord) -> SchedulerResult<()> {
        self.mutate(|records| {
            records.insert(record.data_source_id.clone(), record.clone());
        })
    }

    async fn update(&self, record: &ScheduleRecord) -> SchedulerResult<bool> {
        if !self.records.lock().contains_key(&record.data_source_id) {
            return Ok(false);
        }
        self.mutate(|records| match records.get_mut(&record.data_source_id) {
            Some(existing) => {
                *existing = record.clone();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, data_source_id: &str) -> SchedulerResult<bool> {
        if !self.records.lock().contains_key(data_source_id) {
            return Ok(false);
        }
        self.mutate(|records| records.remove(data_source_id).is_some())
    }

    async fn get(&self, data_source_id: &str) -> SchedulerResult<Option<ScheduleRecord>> {
        Ok(self.records.lock().get(data_source_id).cloned())
    }

    async fn list_active(&self) -> SchedulerResult<Vec<ScheduleRecord>> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| r.is_restorable())
            .cloned()
            .collect())
    }
}
