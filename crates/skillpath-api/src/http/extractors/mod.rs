//! Request extractors.

pub mod learner;
pub mod query;
