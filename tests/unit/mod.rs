//! Unit tests for individual components

mod builders_test;
mod config_test;
mod emitter_test;
mod error_test;
mod observability_test;
mod runtime_test;
mod store_test;
mod util_test;
