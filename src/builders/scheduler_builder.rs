//! Builders to construct a running scheduler from configuration.
//!
//! Construction order is fixed: build the store, recover live jobs from it,
//! then start the dispatch loop. Callers only get the scheduler back once
//! recovery has finished, so administrative traffic cannot race it.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::config::{SchedulerConfig, StoreBackendConfig};
use crate::core::{
    reconcile, AppResult, FireNotification, NotificationEmitter, ObservabilitySink,
    PollingScheduler, ReconciliationReport, ScheduleStore, SchedulerOptions, SchedulerResult,
};
use crate::infra::{ChannelEmitter, FileScheduleStore, InMemoryStore};
use crate::util::clock::Clock;

/// A started scheduler plus what the caller needs to consume it.
#[derive(Debug)]
pub struct SchedulerHandle {
    /// The scheduler, dispatch loop running.
    pub scheduler: PollingScheduler,
    /// Fire notifications for the downstream poll executor.
    pub notifications: mpsc::Receiver<FireNotification>,
    /// Startup recovery outcome.
    pub report: ReconciliationReport,
}

/// Build the configured store backend.
pub fn build_store(cfg: &StoreBackendConfig) -> SchedulerResult<Arc<dyn ScheduleStore>> {
    match cfg {
        StoreBackendConfig::InMemory => Ok(Arc::new(InMemoryStore::new())),
        StoreBackendConfig::File { path, stream } => {
            Ok(Arc::new(FileScheduleStore::new(path, stream.clone())?))
        }
    }
}

/// Reconcile a fresh scheduler against `store`, then start dispatch.
///
/// A partially failed recovery still starts the scheduler; the failures are
/// in the returned report.
pub async fn start_scheduler(
    store: Arc<dyn ScheduleStore>,
    emitter: Arc<dyn NotificationEmitter>,
    sink: Arc<dyn ObservabilitySink>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
) -> SchedulerResult<(PollingScheduler, ReconciliationReport)> {
    let scheduler = PollingScheduler::new(store, emitter, sink, clock, options);
    let report = reconcile(&scheduler).await?;
    scheduler.start();
    Ok((scheduler, report))
}

/// Build store, channel emitter, and scheduler from configuration.
pub async fn build_scheduler(
    cfg: &SchedulerConfig,
    sink: Arc<dyn ObservabilitySink>,
    clock: Arc<dyn Clock>,
) -> AppResult<SchedulerHandle> {
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("config invalid: {e}"))?;
    let options = cfg.scheduler_options()?;
    let store = build_store(&cfg.store).context("building schedule store")?;
    let (emitter, notifications) = ChannelEmitter::new(cfg.emitter.channel_capacity);
    let (scheduler, report) = start_scheduler(store, Arc::new(emitter), sink, clock, options)
        .await
        .context("recovering schedules")?;
    Ok(SchedulerHandle {
        scheduler,
        notifications,
        report,
    })
}
