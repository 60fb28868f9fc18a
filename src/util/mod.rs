//! Shared utilities.

pub mod clock;
pub mod locks;
pub mod serde;
pub mod telemetry;

pub use self::clock::*;
pub use self::locks::KeyedLocks;
pub use self::serde::*;
pub use self::telemetry::*;
