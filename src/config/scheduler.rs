//! Scheduler configuration structures.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, GuardRails, SchedulerOptions};

/// Prefix of every environment variable read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "POLLING_SCHEDULER_";

/// Schedule store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store for development/testing.
    #[default]
    InMemory,
    /// JSON-lines file store.
    File {
        /// Directory holding the file.
        path: PathBuf,
        /// File stem within the directory.
        #[serde(default = "default_stream")]
        stream: String,
    },
}

/// Notification emitter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Bounded channel capacity.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Polling interval window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRailConfig {
    /// Shortest accepted interval in seconds.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    /// Longest accepted interval in seconds.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
}

impl Default for GuardRailConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
        }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Longest sleep when no job is armed, in milliseconds.
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            idle_wait_ms: default_idle_wait_ms(),
        }
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Store backend.
    #[serde(default)]
    pub store: StoreBackendConfig,
    /// Emitter settings.
    #[serde(default)]
    pub emitter: EmitterConfig,
    /// Interval window.
    #[serde(default)]
    pub guard_rails: GuardRailConfig,
    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

fn default_stream() -> String {
    "schedules".to_string()
}

const fn default_channel_capacity() -> usize {
    1024
}

const fn default_min_interval_secs() -> u64 {
    1
}

const fn default_max_interval_secs() -> u64 {
    86_400
}

const fn default_idle_wait_ms() -> u64 {
    60_000
}

impl GuardRailConfig {
    /// Validate the window.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_interval_secs == 0 {
            return Err("min_interval_secs must be greater than 0".into());
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err("min_interval_secs must not exceed max_interval_secs".into());
        }
        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        if let StoreBackendConfig::File { path, stream } = &self.store {
            if path.as_os_str().is_empty() {
                return Err("file store path must not be empty".into());
            }
            if stream.trim().is_empty() {
                return Err("file store stream must not be empty".into());
            }
        }
        if self.emitter.channel_capacity == 0 {
            return Err("channel_capacity must be greater than 0".into());
        }
        self.guard_rails
            .validate()
            .map_err(|e| format!("guard_rails invalid: {e}"))?;
        if self.dispatch.idle_wait_ms == 0 {
            return Err("idle_wait_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a `.env` file if present, then read `POLLING_SCHEDULER_*`
    /// variables over the defaults.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let number = |name: &str| -> AppResult<Option<u64>> {
            var(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{ENV_PREFIX}{name}=`{raw}` is not a number"))
                })
                .transpose()
        };

        let mut cfg = Self::default();
        match var("STORE").as_deref().map(str::trim) {
            None | Some("in_memory") => {}
            Some("file") => {
                let path = var("STORE_PATH")
                    .with_context(|| format!("{ENV_PREFIX}STORE_PATH is required for the file store"))?;
                cfg.store = StoreBackendConfig::File {
                    path: PathBuf::from(path),
                    stream: var("STORE_STREAM").unwrap_or_else(default_stream),
                };
            }
            Some(other) => anyhow::bail!("{ENV_PREFIX}STORE=`{other}` is not a known backend"),
        }
        if let Some(capacity) = number("CHANNEL_CAPACITY")? {
            cfg.emitter.channel_capacity = usize::try_from(capacity)
                .context("channel capacity does not fit in usize")?;
        }
        if let Some(secs) = number("MIN_INTERVAL_SECS")? {
            cfg.guard_rails.min_interval_secs = secs;
        }
        if let Some(secs) = number("MAX_INTERVAL_SECS")? {
            cfg.guard_rails.max_interval_secs = secs;
        }
        if let Some(ms) = number("IDLE_WAIT_MS")? {
            cfg.dispatch.idle_wait_ms = ms;
        }

        cfg.validate()
            .map_err(|e| anyhow::anyhow!("configuration invalid: {e}"))?;
        Ok(cfg)
    }

    /// Guard rails described by this configuration.
    pub fn guard_rails(&self) -> AppResult<GuardRails> {
        Ok(GuardRails::new(
            Duration::from_secs(self.guard_rails.min_interval_secs),
            Duration::from_secs(self.guard_rails.max_interval_secs),
        )?)
    }

    /// Scheduler options described by this configuration.
    pub fn scheduler_options(&self) -> AppResult<SchedulerOptions> {
        Ok(SchedulerOptions {
            guard_rails: self.guard_rails()?,
            idle_wait: Duration::from_millis(self.dispatch.idle_wait_ms),
        })
    }
}
