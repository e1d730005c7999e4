//! Shared domain types for Skillpath.
//!
//! This crate contains the domain types used across the Skillpath workspace:
//! skills, learning paths, achievements, progression events, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod achievement;
pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod learner;
pub mod path;
pub mod skill;
