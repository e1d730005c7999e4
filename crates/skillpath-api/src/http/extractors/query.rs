//! Query parameter extractors.

use serde::Deserialize;

/// Query parameters for the recommendations endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct RecommendQuery {
    /// Maximum suggestions. Defaults to the configured limit.
    pub limit: Option<usize>,
}
