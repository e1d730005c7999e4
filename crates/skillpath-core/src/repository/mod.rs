//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (skillpath-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod catalog;
pub mod progress;

pub use catalog::{InMemoryCatalog, PathCatalog};
pub use progress::{
    CommitReceipt, InMemoryProgressStore, ProgressCommit, ProgressStore, StoredPathProgress,
};
