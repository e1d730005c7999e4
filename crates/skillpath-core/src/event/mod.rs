//! Event bus for committed progression events.
//!
//! Provides an `EventBus` that distributes `ProgressionEvent` messages to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
