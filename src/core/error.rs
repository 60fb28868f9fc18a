//! Error types for scheduler operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Cron syntax invalid or polling interval outside the allowed window.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// No live job exists for the data source.
    #[error("no schedule found for data source {0}")]
    NotFound(String),
    /// A live job already exists for the data source.
    #[error("data source {0} is already scheduled")]
    AlreadyScheduled(String),
    /// The durable write failed after the in-memory mutation was applied.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    /// Startup recovery could not restore every record.
    #[error("reconciliation partially failed: {succeeded} restored, {failed} failed")]
    ReconciliationPartialFailure {
        /// Records restored into the live registry.
        succeeded: usize,
        /// Records skipped because they failed to parse or register.
        failed: usize,
    },
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Copyable discriminant of [`SchedulerError`] for transport-layer mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`SchedulerError::InvalidConfiguration`].
    InvalidConfiguration,
    /// See [`SchedulerError::NotFound`].
    NotFound,
    /// See [`SchedulerError::AlreadyScheduled`].
    AlreadyScheduled,
    /// See [`SchedulerError::PersistenceFailure`].
    PersistenceFailure,
    /// See [`SchedulerError::ReconciliationPartialFailure`].
    ReconciliationPartialFailure,
    /// See [`SchedulerError::Backend`].
    Backend,
}

impl SchedulerError {
    /// Error kind without the payload.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyScheduled(_) => ErrorKind::AlreadyScheduled,
            Self::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            Self::ReconciliationPartialFailure { .. } => ErrorKind::ReconciliationPartialFailure,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_) | Self::Backend(_))
    }
}

/// Result alias used across the scheduler core.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
