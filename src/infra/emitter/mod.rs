//! Notification emitter backends.

pub mod channel;
pub mod memory;

pub use channel::{ChannelEmitter, DEFAULT_CHANNEL_CAPACITY};
pub use memory::InMemoryEmitter;
