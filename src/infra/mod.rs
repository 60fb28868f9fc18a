//! Infrastructure adapters for schedule stores and notification emitters.

pub mod emitter;
pub mod store;

pub use emitter::{ChannelEmitter, InMemoryEmitter};
pub use store::{FileScheduleStore, InMemoryStore};
