//! Administrative API surface and data-source lifecycle handling.

pub mod api;
pub mod events;

pub use api::{health, Health, OperationResponse, ScheduleRequest, UpdateScheduleRequest};
pub use events::{handle_event, DataSourceChange, DataSourceEvent, EventOutcome};
