//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use polling_scheduler::core::{
    InMemorySink, PollingScheduler, ScheduleRecord, ScheduleStore, SchedulerError,
    SchedulerOptions, SchedulerResult,
};
use polling_scheduler::infra::{InMemoryEmitter, InMemoryStore};
use polling_scheduler::util::ManualClock;

/// 2024-06-15 at the given time of day.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, h, m, s).unwrap()
}

/// Active record polling every minute.
pub fn record(id: &str, cron: &str) -> ScheduleRecord {
    ScheduleRecord::new(id, cron, Duration::from_secs(60), at(0, 0, 0))
        .with_names(format!("{id} name"), "Acme")
        .with_correlation_id(format!("corr-{id}"))
}

/// In-memory store whose writes can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> SchedulerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(SchedulerError::Backend("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ScheduleStore for FlakyStore {
    async fn create(&self, record: &ScheduleRecord) -> SchedulerResult<()> {
        self.check()?;
        self.inner.create(record).await
    }

    async fn update(&self, record: &ScheduleRecord) -> SchedulerResult<bool> {
        self.check()?;
        self.inner.update(record).await
    }

    async fn delete(&self, data_source_id: &str) -> SchedulerResult<bool> {
        self.check()?;
        self.inner.delete(data_source_id).await
    }

    async fn get(&self, data_source_id: &str) -> SchedulerResult<Option<ScheduleRecord>> {
        self.inner.get(data_source_id).await
    }

    async fn list_active(&self) -> SchedulerResult<Vec<ScheduleRecord>> {
        self.inner.list_active().await
    }
}

/// Scheduler wired to in-memory collaborators and a manual clock.
pub struct Harness<S: ScheduleStore + 'static> {
    pub scheduler: PollingScheduler,
    pub store: Arc<S>,
    pub emitter: Arc<InMemoryEmitter>,
    pub sink: Arc<InMemorySink>,
    pub clock: Arc<ManualClock>,
}

impl Harness<InMemoryStore> {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), start)
    }
}

impl<S: ScheduleStore + 'static> Harness<S> {
    pub fn with_store(store: Arc<S>, start: DateTime<Utc>) -> Self {
        let emitter = Arc::new(InMemoryEmitter::new());
        let sink = Arc::new(InMemorySink::new(256));
        let clock = Arc::new(ManualClock::new(start));
        let scheduler = PollingScheduler::new(
            store.clone(),
            emitter.clone(),
            sink.clone(),
            clock.clone(),
            SchedulerOptions::default(),
        );
        Self {
            scheduler,
            store,
            emitter,
            sink,
            clock,
        }
    }

    /// Fresh scheduler over the same store, as after a restart.
    pub fn restarted(&self, now: DateTime<Utc>) -> Self {
        Self::with_store(self.store.clone(), now)
    }
}
