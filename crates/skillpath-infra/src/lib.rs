//! Infrastructure layer for Skillpath.
//!
//! Contains implementations of the repository traits defined in `skillpath-core`:
//! SQLite progress storage, the TOML file catalog, configuration loading and
//! data directory resolution.

pub mod catalog;
pub mod config;
pub mod filesystem;
pub mod sqlite;
