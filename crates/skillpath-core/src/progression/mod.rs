//! Learner progress on a single path: state, transitions, and rollups.

pub mod aggregator;
pub mod engine;
pub mod state;

pub use aggregator::{PathAggregator, rollup_percentage};
pub use engine::ProgressionEngine;
pub use state::LearnerPathState;
