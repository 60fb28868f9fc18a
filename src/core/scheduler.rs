//! Scheduler core: live job registry, lifecycle operations, dispatch loop.
//!
//! Locking has two levels:
//!
//! - A per-`data_source_id` permit ([`KeyedLocks`]) serializes whole
//!   operations on one id, including the awaited store write. Different ids
//!   never wait on each other's permits.
//! - One `parking_lot::Mutex` guards the [`Registry`]. It is held only for
//!   in-memory work and never across an `.await`, so a fire (pop, recompute,
//!   re-insert) and an administrative mutation each apply atomically.
//!
//! The store is eventually consistent with the registry. A failed durable
//! write is reported as `PersistenceFailure` but the in-memory change stays.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::core::cron::CronExpression;
use crate::core::emitter::{FireNotification, NotificationEmitter};
use crate::core::guard::GuardRails;
use crate::core::observability::{
    build_operation_event, ObservabilitySink, Operation, Outcome, ReconciliationCounts,
};
use crate::core::registry::Registry;
use crate::core::schedule::{JobState, LiveJob, ScheduleRecord, ScheduleStatus};
use crate::core::store::ScheduleStore;
use crate::core::{SchedulerError, SchedulerResult};
use crate::util::clock::Clock;
use crate::util::locks::KeyedLocks;

/// Longest the dispatch loop sleeps when nothing is armed.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_secs(60);

/// Tunables for a [`PollingScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Interval window and cron checks.
    pub guard_rails: GuardRails,
    /// Upper bound on a single dispatch sleep.
    pub idle_wait: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            guard_rails: GuardRails::default(),
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }
}

/// Result of re-registering one durable record at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A live job was created.
    Restored {
        /// Whether the refreshed `next_execution_time` reached the store.
        persisted: bool,
    },
    /// A live job already existed; nothing changed.
    AlreadyLive,
}

struct Inner {
    registry: Mutex<Registry>,
    locks: KeyedLocks,
    store: Arc<dyn ScheduleStore>,
    emitter: Arc<dyn NotificationEmitter>,
    sink: Arc<dyn ObservabilitySink>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
    wake: Notify,
    shutdown: watch::Sender<bool>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

/// Single scheduling authority for a process. Cheap to clone; clones share
/// state.
#[derive(Clone)]
pub struct PollingScheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for PollingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let jobs = self.inner.registry.lock().len();
        f.debug_struct("PollingScheduler")
            .field("jobs", &jobs)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl PollingScheduler {
    /// Assemble a scheduler. The dispatch loop is not started.
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        emitter: Arc<dyn NotificationEmitter>,
        sink: Arc<dyn ObservabilitySink>,
        clock: Arc<dyn Clock>,
        options: SchedulerOptions,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new()),
                locks: KeyedLocks::new(),
                store,
                emitter,
                sink,
                clock,
                options,
                wake: Notify::new(),
                shutdown,
                dispatch: Mutex::new(None),
            }),
        }
    }

    /// Guard rails applied to every mutation.
    pub fn guard_rails(&self) -> &GuardRails {
        &self.inner.options.guard_rails
    }

    /// Current instant according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Register a new job and persist its record.
    ///
    /// Fails with `AlreadyScheduled` if the id is live; call
    /// [`PollingScheduler::unschedule`] or [`PollingScheduler::reschedule`]
    /// instead.
    pub async fn schedule(&self, record: ScheduleRecord) -> SchedulerResult<ScheduleStatus> {
        let id = record.data_source_id.clone();
        let correlation_id = record.correlation_id.clone();
        let result = self.schedule_inner(record).await;
        self.observe(Operation::ScheduleCreated, &id, Some(&correlation_id), &result);
        result
    }

    async fn schedule_inner(&self, record: ScheduleRecord) -> SchedulerResult<ScheduleStatus> {
        let cron = self
            .inner
            .options
            .guard_rails
            .check(&record.cron_expression, record.polling_interval)?;
        let _permit = self.inner.locks.acquire(&record.data_source_id).await?;
        if self.inner.registry.lock().contains(&record.data_source_id) {
            return Err(SchedulerError::AlreadyScheduled(record.data_source_id));
        }
        let now = self.now();
        let next = first_fire(&cron, now)?;
        self.register_and_persist(record, cron, now, next).await
    }

    /// Replace any live job for the record's id, then schedule it. Both steps
    /// run under the id's permit.
    pub async fn reschedule(&self, record: ScheduleRecord) -> SchedulerResult<ScheduleStatus> {
        let id = record.data_source_id.clone();
        let correlation_id = record.correlation_id.clone();
        let result = self.reschedule_inner(record).await;
        self.observe(Operation::ScheduleUpdated, &id, Some(&correlation_id), &result);
        result
    }

    async fn reschedule_inner(&self, record: ScheduleRecord) -> SchedulerResult<ScheduleStatus> {
        let cron = self
            .inner
            .options
            .guard_rails
            .check(&record.cron_expression, record.polling_interval)?;
        let _permit = self.inner.locks.acquire(&record.data_source_id).await?;
        let now = self.now();
        let next = first_fire(&cron, now)?;
        let replaced = self
            .inner
            .registry
            .lock()
            .remove(&record.data_source_id)
            .is_some();
        tracing::debug!(data_source_id = %record.data_source_id, replaced, "rescheduling");
        self.register_and_persist(record, cron, now, next).await
    }

    /// Remove the live job and delete the durable record.
    ///
    /// Returns `Ok(true)` if either side had something to remove and
    /// `Ok(false)` if neither did; repeated calls keep succeeding.
    pub async fn unschedule(&self, data_source_id: &str) -> SchedulerResult<bool> {
        let result = self.unschedule_inner(data_source_id).await;
        self.observe(Operation::ScheduleDeleted, data_source_id, None, &result);
        result
    }

    async fn unschedule_inner(&self, data_source_id: &str) -> SchedulerResult<bool> {
        let permit = self.inner.locks.acquire(data_source_id).await?;
        let live = self.inner.registry.lock().remove(data_source_id).is_some();
        let stored = self
            .inner
            .store
            .delete(data_source_id)
            .await
            .map_err(|e| persistence_failure(data_source_id, &e))?;
        drop(permit);
        self.inner.locks.prune_idle();
        tracing::info!(
            data_source_id,
            live_removed = live,
            record_removed = stored,
            "schedule deleted"
        );
        Ok(live || stored)
    }

    /// Replace the cron expression and interval of a live job and recompute
    /// its next fire from now. The firing count is kept. A paused job stays
    /// paused and picks up the new expression on resume.
    pub async fn update_interval(
        &self,
        data_source_id: &str,
        cron_expression: &str,
        polling_interval: Duration,
        correlation_id: Option<&str>,
    ) -> SchedulerResult<ScheduleStatus> {
        let result = self
            .update_interval_inner(data_source_id, cron_expression, polling_interval, correlation_id)
            .await;
        self.observe(Operation::ScheduleUpdated, data_source_id, correlation_id, &result);
        result
    }

    async fn update_interval_inner(
        &self,
        data_source_id: &str,
        cron_expression: &str,
        polling_interval: Duration,
        correlation_id: Option<&str>,
    ) -> SchedulerResult<ScheduleStatus> {
        let cron = self
            .inner
            .options
            .guard_rails
            .check(cron_expression, polling_interval)?;
        let _permit = self.inner.locks.acquire(data_source_id).await?;
        let now = self.now();
        let next = first_fire(&cron, now)?;
        let status = {
            let mut registry = self.inner.registry.lock();
            let job = registry
                .get_mut(data_source_id)
                .ok_or_else(|| SchedulerError::NotFound(data_source_id.to_string()))?;
            job.cron = cron;
            job.polling_interval = polling_interval;
            if let Some(correlation_id) = correlation_id {
                job.correlation_id = correlation_id.to_string();
            }
            if job.state == JobState::Active {
                job.next_fire_at = Some(next);
            }
            let status = job.status();
            registry.rearm(data_source_id);
            status
        };
        self.inner.wake.notify_one();
        self.persist_live(data_source_id, now).await?;
        tracing::info!(
            data_source_id,
            cron = %status.cron_expression,
            next_fire_at = ?status.next_fire_at,
            "schedule updated"
        );
        Ok(status)
    }

    /// Stop firing without removing the job. Pausing a paused job is a no-op.
    pub async fn pause(&self, data_source_id: &str) -> SchedulerResult<ScheduleStatus> {
        let result = self.pause_inner(data_source_id).await;
        self.observe(Operation::SchedulePaused, data_source_id, None, &result);
        result
    }

    async fn pause_inner(&self, data_source_id: &str) -> SchedulerResult<ScheduleStatus> {
        let _permit = self.inner.locks.acquire(data_source_id).await?;
        let now = self.now();
        let (status, changed) = {
            let mut registry = self.inner.registry.lock();
            let job = registry
                .get_mut(data_source_id)
                .ok_or_else(|| SchedulerError::NotFound(data_source_id.to_string()))?;
            if job.state == JobState::Paused {
                (job.status(), false)
            } else {
                job.state = JobState::Paused;
                job.next_fire_at = None;
                let status = job.status();
                registry.rearm(data_source_id);
                (status, true)
            }
        };
        if changed {
            self.persist_live(data_source_id, now).await?;
            tracing::info!(data_source_id, "schedule paused");
        }
        Ok(status)
    }

    /// Re-arm a paused job with its next fire computed from now. Resuming an
    /// active job is a no-op.
    pub async fn resume(&self, data_source_id: &str) -> SchedulerResult<ScheduleStatus> {
        let result = self.resume_inner(data_source_id).await;
        self.observe(Operation::ScheduleResumed, data_source_id, None, &result);
        result
    }

    async fn resume_inner(&self, data_source_id: &str) -> SchedulerResult<ScheduleStatus> {
        let _permit = self.inner.locks.acquire(data_source_id).await?;
        let now = self.now();
        let (status, changed) = {
            let mut registry = self.inner.registry.lock();
            let job = registry
                .get_mut(data_source_id)
                .ok_or_else(|| SchedulerError::NotFound(data_source_id.to_string()))?;
            if job.state == JobState::Active {
                (job.status(), false)
            } else {
                job.state = JobState::Active;
                job.next_fire_at = job.cron.next_after(&now);
                let status = job.status();
                registry.rearm(data_source_id);
                (status, true)
            }
        };
        if changed {
            self.inner.wake.notify_one();
            self.persist_live(data_source_id, now).await?;
            tracing::info!(
                data_source_id,
                next_fire_at = ?status.next_fire_at,
                "schedule resumed"
            );
        }
        Ok(status)
    }

    /// Emit a manual notification now. The job's cadence, state, and
    /// firing count are untouched; paused jobs may be triggered.
    pub async fn trigger_now(
        &self,
        data_source_id: &str,
        correlation_id: Option<&str>,
    ) -> SchedulerResult<FireNotification> {
        let result = self.trigger_now_inner(data_source_id, correlation_id).await;
        self.observe(Operation::ManualTrigger, data_source_id, correlation_id, &result);
        result
    }

    async fn trigger_now_inner(
        &self,
        data_source_id: &str,
        correlation_id: Option<&str>,
    ) -> SchedulerResult<FireNotification> {
        let _permit = self.inner.locks.acquire(data_source_id).await?;
        let now = self.now();
        let notification = {
            let registry = self.inner.registry.lock();
            let job = registry
                .get(data_source_id)
                .ok_or_else(|| SchedulerError::NotFound(data_source_id.to_string()))?;
            FireNotification {
                data_source_id: job.data_source_id.clone(),
                data_source_name: job.data_source_name.clone(),
                supplier_name: job.supplier_name.clone(),
                correlation_id: correlation_id
                    .map_or_else(|| job.correlation_id.clone(), str::to_string),
                fired_at: now,
                manual: true,
            }
        };
        self.inner.emitter.emit(notification.clone())?;
        tracing::info!(
            data_source_id,
            correlation_id = %notification.correlation_id,
            "manual trigger emitted"
        );
        Ok(notification)
    }

    /// Snapshot of one live job.
    pub fn status(&self, data_source_id: &str) -> SchedulerResult<ScheduleStatus> {
        self.inner
            .registry
            .lock()
            .get(data_source_id)
            .map(LiveJob::status)
            .ok_or_else(|| SchedulerError::NotFound(data_source_id.to_string()))
    }

    /// Snapshot of every live job, ordered by id.
    pub fn list_all(&self) -> Vec<ScheduleStatus> {
        self.inner.registry.lock().statuses()
    }

    /// Next `count` fire instants of a live job, from now.
    pub fn preview(
        &self,
        data_source_id: &str,
        count: usize,
    ) -> SchedulerResult<Vec<DateTime<Utc>>> {
        let cron = self
            .inner
            .registry
            .lock()
            .get(data_source_id)
            .map(|job| job.cron.clone())
            .ok_or_else(|| SchedulerError::NotFound(data_source_id.to_string()))?;
        Ok(cron.upcoming(&self.now(), count))
    }

    /// `(active, paused)` live job counts.
    pub fn job_counts(&self) -> (usize, usize) {
        self.inner.registry.lock().counts()
    }

    /// Register a durable record found at startup.
    ///
    /// Skips ids that are already live. Parse failures are returned as
    /// `InvalidConfiguration`; a failed write-back of the refreshed fire time
    /// still leaves the job live.
    pub async fn restore(&self, record: ScheduleRecord) -> SchedulerResult<RestoreOutcome> {
        let id = record.data_source_id.clone();
        let _permit = self.inner.locks.acquire(&id).await?;
        if self.inner.registry.lock().contains(&id) {
            return Ok(RestoreOutcome::AlreadyLive);
        }
        let cron = CronExpression::parse(&record.cron_expression)?;
        let now = self.now();
        let next = first_fire(&cron, now)?;
        let job = live_job(&record, cron, next);
        if !self.inner.registry.lock().insert(job) {
            return Ok(RestoreOutcome::AlreadyLive);
        }
        self.inner.wake.notify_one();

        let mut refreshed = record;
        refreshed.next_execution_time = Some(next);
        refreshed.updated_at = now;
        let written = match self.inner.store.update(&refreshed).await {
            Ok(true) => Ok(()),
            Ok(false) => self.inner.store.create(&refreshed).await,
            Err(e) => Err(e),
        };
        let persisted = match written {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(data_source_id = %id, error = %e, "restored fire time not persisted");
                false
            }
        };
        tracing::debug!(data_source_id = %id, next_fire_at = %next, "schedule restored");
        Ok(RestoreOutcome::Restored { persisted })
    }

    pub(crate) async fn load_restorable(&self) -> SchedulerResult<Vec<ScheduleRecord>> {
        let records = self.inner.store.list_active().await?;
        Ok(records.into_iter().filter(ScheduleRecord::is_restorable).collect())
    }

    pub(crate) fn report_reconciliation(&self, counts: ReconciliationCounts) {
        self.inner.sink.reconciliation(counts);
    }

    /// Fire every active job due at or before the clock's now, emit the
    /// notifications, and persist refreshed records before returning.
    ///
    /// The background dispatch loop runs the same steps but does not wait for
    /// persistence.
    pub async fn fire_due(&self) -> Vec<FireNotification> {
        let fired = self.collect_due(self.now());
        self.emit_all(&fired);
        for notification in &fired {
            self.persist_after_fire(&notification.data_source_id).await;
        }
        fired
    }

    /// Spawn the dispatch loop on the current tokio runtime. Returns `false`
    /// if it is already running.
    pub fn start(&self) -> bool {
        let mut slot = self.inner.dispatch.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        self.inner.shutdown.send_replace(false);
        let shutdown = self.inner.shutdown.subscribe();
        let scheduler = self.clone();
        *slot = Some(tokio::spawn(scheduler.run_dispatch(shutdown)));
        tracing::info!("dispatch loop started");
        true
    }

    /// Stop the dispatch loop and wait for it to exit. Live jobs are kept.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = self.inner.dispatch.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "dispatch loop ended abnormally");
            }
        }
    }

    /// Number of ids with a per-id lock currently allocated.
    pub fn tracked_lock_count(&self) -> usize {
        self.inner.locks.len()
    }

    /// Whether the dispatch loop is running.
    pub fn is_dispatch_running(&self) -> bool {
        self.inner
            .dispatch
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn run_dispatch(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = self.now();
            let fired = self.collect_due(now);
            self.emit_all(&fired);
            for notification in fired {
                let scheduler = self.clone();
                tokio::spawn(async move {
                    scheduler
                        .persist_after_fire(&notification.data_source_id)
                        .await;
                });
            }

            let wait = self.dispatch_wait(now);
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.inner.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("dispatch loop stopped");
    }

    fn dispatch_wait(&self, now: DateTime<Utc>) -> Duration {
        let idle = self.inner.options.idle_wait;
        let next = self.inner.registry.lock().next_due();
        next.map_or(idle, |at| {
            (at - now).to_std().unwrap_or(Duration::ZERO).min(idle)
        })
    }

    /// Pop, recompute from `now`, and re-arm every due job in one critical
    /// section. Missed instants are not backfilled.
    fn collect_due(&self, now: DateTime<Utc>) -> Vec<FireNotification> {
        let mut registry = self.inner.registry.lock();
        let mut fired = Vec::new();
        while let Some(id) = registry.pop_due(now) {
            let Some(job) = registry.get_mut(&id) else {
                continue;
            };
            job.firing_count += 1;
            job.last_fired_at = Some(now);
            job.next_fire_at = job.cron.next_after(&now);
            if job.next_fire_at.is_none() {
                tracing::warn!(data_source_id = %id, cron = %job.cron, "schedule has no further fire times");
            }
            fired.push(FireNotification {
                data_source_id: job.data_source_id.clone(),
                data_source_name: job.data_source_name.clone(),
                supplier_name: job.supplier_name.clone(),
                correlation_id: job.correlation_id.clone(),
                fired_at: now,
                manual: false,
            });
            registry.rearm(&id);
        }
        fired
    }

    fn emit_all(&self, fired: &[FireNotification]) {
        for notification in fired {
            match self.inner.emitter.emit(notification.clone()) {
                Ok(()) => tracing::debug!(
                    data_source_id = %notification.data_source_id,
                    fired_at = %notification.fired_at,
                    "fire notification emitted"
                ),
                Err(e) => tracing::error!(
                    data_source_id = %notification.data_source_id,
                    error = %e,
                    "fire notification dropped"
                ),
            }
        }
    }

    async fn persist_after_fire(&self, data_source_id: &str) {
        let Ok(_permit) = self.inner.locks.acquire(data_source_id).await else {
            return;
        };
        if let Err(e) = self.persist_live(data_source_id, self.now()).await {
            tracing::warn!(data_source_id, error = %e, "fire bookkeeping not persisted");
        }
    }

    /// Write the live job's current state to its durable record. Caller holds
    /// the id's permit. Does nothing once the job is gone, so a late write can
    /// never resurrect a deleted schedule.
    async fn persist_live(&self, data_source_id: &str, now: DateTime<Utc>) -> SchedulerResult<()> {
        let job = self.inner.registry.lock().get(data_source_id).cloned();
        let Some(job) = job else {
            return Ok(());
        };
        let store = &self.inner.store;
        let existing = store
            .get(data_source_id)
            .await
            .map_err(|e| persistence_failure(data_source_id, &e))?;
        match existing {
            Some(mut record) => {
                job.apply_to(&mut record, now);
                store
                    .update(&record)
                    .await
                    .map_err(|e| persistence_failure(data_source_id, &e))?;
            }
            None => {
                let mut record = ScheduleRecord::new(
                    data_source_id,
                    job.cron.as_str(),
                    job.polling_interval,
                    now,
                );
                job.apply_to(&mut record, now);
                store
                    .create(&record)
                    .await
                    .map_err(|e| persistence_failure(data_source_id, &e))?;
            }
        }
        Ok(())
    }

    /// Caller holds the id's permit and has checked the id is not live.
    async fn register_and_persist(
        &self,
        mut record: ScheduleRecord,
        cron: CronExpression,
        now: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> SchedulerResult<ScheduleStatus> {
        let id = record.data_source_id.clone();
        record.cron_expression = cron.as_str().to_string();
        let job = live_job(&record, cron, next);
        let status = job.status();
        if !self.inner.registry.lock().insert(job) {
            return Err(SchedulerError::AlreadyScheduled(id));
        }
        self.inner.wake.notify_one();

        record.is_active = true;
        record.is_paused = false;
        record.next_execution_time = Some(next);
        record.updated_at = now;
        self.inner
            .store
            .create(&record)
            .await
            .map_err(|e| persistence_failure(&id, &e))?;
        tracing::info!(
            data_source_id = %id,
            correlation_id = %record.correlation_id,
            cron = %record.cron_expression,
            next_fire_at = %next,
            "schedule created"
        );
        Ok(status)
    }

    fn observe<T>(
        &self,
        operation: Operation,
        data_source_id: &str,
        correlation_id: Option<&str>,
        result: &SchedulerResult<T>,
    ) {
        if matches!(result, Err(SchedulerError::NotFound(_))) {
            self.inner.locks.prune_idle();
        }
        let (outcome, detail) = match result {
            Ok(_) => (Outcome::Success, None),
            Err(e) => {
                tracing::warn!(
                    operation = operation.as_str(),
                    data_source_id,
                    error = %e,
                    "operation failed"
                );
                (Outcome::Failure, Some(e.to_string()))
            }
        };
        self.inner.sink.record(build_operation_event(
            data_source_id,
            operation,
            outcome,
            correlation_id.map(str::to_string),
            detail,
        ));
    }
}

fn first_fire(cron: &CronExpression, now: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
    cron.next_after(&now).ok_or_else(|| {
        SchedulerError::InvalidConfiguration(format!(
            "cron expression `{cron}` has no fire time after {now}"
        ))
    })
}

fn live_job(record: &ScheduleRecord, cron: CronExpression, next: DateTime<Utc>) -> LiveJob {
    LiveJob {
        data_source_id: record.data_source_id.clone(),
        data_source_name: record.data_source_name.clone(),
        supplier_name: record.supplier_name.clone(),
        cron,
        polling_interval: record.polling_interval,
        state: JobState::Active,
        next_fire_at: Some(next),
        last_fired_at: None,
        firing_count: 0,
        correlation_id: record.correlation_id.clone(),
    }
}

fn persistence_failure(data_source_id: &str, err: &SchedulerError) -> SchedulerError {
    tracing::error!(data_source_id, error = %err, "durable write failed; live state kept");
    SchedulerError::PersistenceFailure(err.to_string())
}
