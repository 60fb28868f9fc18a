//! Guard rails applied before any schedule mutation is accepted.

use std::time::Duration;

use tracing::warn;

use crate::core::cron::CronExpression;
use crate::core::{SchedulerError, SchedulerResult};

/// Shortest accepted polling interval.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
/// Longest accepted polling interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(86_400);

/// Interval window and cron syntax checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardRails {
    min_interval: Duration,
    max_interval: Duration,
}

impl Default for GuardRails {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

impl GuardRails {
    /// Custom window; `min` must be non-zero and not exceed `max`.
    pub fn new(min_interval: Duration, max_interval: Duration) -> SchedulerResult<Self> {
        if min_interval.is_zero() || min_interval > max_interval {
            return Err(SchedulerError::InvalidConfiguration(format!(
                "interval window {min_interval:?}..={max_interval:?} is empty"
            )));
        }
        Ok(Self {
            min_interval,
            max_interval,
        })
    }

    /// Lower bound of the window.
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Upper bound of the window.
    pub const fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Reject intervals outside the window.
    pub fn check_interval(&self, interval: Duration) -> SchedulerResult<()> {
        if interval < self.min_interval || interval > self.max_interval {
            warn!(
                interval_secs = interval.as_secs_f64(),
                min_secs = self.min_interval.as_secs(),
                max_secs = self.max_interval.as_secs(),
                "polling interval rejected"
            );
            return Err(SchedulerError::InvalidConfiguration(format!(
                "polling interval {interval:?} outside {:?}..={:?}",
                self.min_interval, self.max_interval
            )));
        }
        Ok(())
    }

    /// Parse the expression, mapping syntax errors to `InvalidConfiguration`.
    pub fn check_cron(&self, expression: &str) -> SchedulerResult<CronExpression> {
        CronExpression::parse(expression).map_err(|e| {
            warn!(cron = expression, reason = %e.reason, "cron expression rejected");
            SchedulerError::from(e)
        })
    }

    /// Both checks, as applied on schedule and update.
    pub fn check(&self, expression: &str, interval: Duration) -> SchedulerResult<CronExpression> {
        self.check_interval(interval)?;
        self.check_cron(expression)
    }
}

/// Derive a cron expression from a bare polling interval.
///
/// Sub-minute intervals poll every 30 seconds; whole minutes below an hour
/// become a minute step; longer intervals become an hour step, capped at
/// once a day.
pub fn effective_cron_expression(interval: Duration) -> String {
    let total_minutes = interval.as_secs() / 60;
    match total_minutes {
        0 => "*/30 * * * * *".to_string(),
        1 => "0 * * * * *".to_string(),
        m if m < 60 => format!("0 */{m} * * * *"),
        m if m / 60 < 24 => format!("0 0 */{} * * *", m / 60),
        _ => "0 0 0 * * ?".to_string(),
    }
}
