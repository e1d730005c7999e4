//! HTTP request handlers for the REST API.

pub mod learner;
pub mod paths;
pub mod skills;
