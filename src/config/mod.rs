//! Configuration models for the schedule store, emitter, guard rails, and
//! dispatch loop.

pub mod scheduler;

pub use scheduler::{
    DispatchConfig, EmitterConfig, GuardRailConfig, SchedulerConfig, StoreBackendConfig,
    ENV_PREFIX,
};
