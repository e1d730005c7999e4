//! Observability for Skillpath: tracing subscriber setup and the attribute
//! names used on spans.

pub mod attrs;
pub mod tracing_setup;

pub use tracing_setup::{LogFormat, init_tracing, init_tracing_with_filter, shutdown_tracing};
