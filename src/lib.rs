//! # Polling Scheduler
//!
//! A persistent cron scheduler deciding, for every registered data source,
//! when its next file-discovery poll must fire.
//!
//! The scheduler keeps a time-ordered registry of live jobs in memory and a
//! durable schedule record per data source in a pluggable store. It survives
//! restarts by reconciling live jobs from the store before accepting
//! administrative traffic, and it tolerates concurrent lifecycle operations
//! while jobs fire.
//!
//! ## Key Features
//!
//! - **Seconds-resolution cron engine**: pure `validate` / `next_fire_time`
//!   functions with Quartz-style syntax (`?`, `L`, `#`, names, optional year)
//! - **Per-source serialization**: operations on one data source are ordered;
//!   different data sources never block each other
//! - **Compute-from-now dispatch**: missed fires during downtime are not
//!   backfilled
//! - **Idempotent recovery**: running reconciliation twice registers nothing
//!   twice; paused schedules stay paused across restarts
//! - **Eventually consistent persistence**: a failed durable write is reported
//!   but never rolls back the live registry
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use polling_scheduler::builders::build_scheduler;
//! use polling_scheduler::config::SchedulerConfig;
//! use polling_scheduler::core::TracingSink;
//! use polling_scheduler::runtime::api::{schedule, ScheduleRequest};
//! use polling_scheduler::util::{init_tracing, SystemClock};
//!
//! init_tracing();
//! let cfg = SchedulerConfig::from_env()?;
//! let mut handle = build_scheduler(&cfg, Arc::new(TracingSink), Arc::new(SystemClock)).await?;
//!
//! let response = schedule(&handle.scheduler, request).await;
//! while let Some(fire) = handle.notifications.recv().await {
//!     // poll fire.data_source_id
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: cron engine, data model, scheduler, recovery.
pub mod core;
/// Configuration models for the store, emitter, guard rails, and dispatch.
pub mod config;
/// Builders to construct a running scheduler from configuration.
pub mod builders;
/// Infrastructure adapters for schedule stores and notification emitters.
pub mod infra;
/// Administrative API surface and lifecycle event handling.
pub mod runtime;
/// Shared utilities.
pub mod util;
