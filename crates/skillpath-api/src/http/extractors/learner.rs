//! Learner identity extractor.
//!
//! Every learner-scoped route names its learner explicitly through the
//! `X-Learner-Id` header. Authentication is handled upstream; this layer
//! only carries the id.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use skillpath_types::learner::LearnerId;

use crate::http::error::AppError;

pub const LEARNER_HEADER: &str = "x-learner-id";

/// The learner a request acts for.
#[derive(Debug, Clone)]
pub struct Learner(pub LearnerId);

impl<S: Send + Sync> FromRequestParts<S> for Learner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_learner(parts)?.ok_or(AppError::MissingLearner)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for Learner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        extract_learner(parts)
    }
}

fn extract_learner(parts: &Parts) -> Result<Option<Learner>, AppError> {
    let Some(value) = parts.headers.get(LEARNER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AppError::Validation("Invalid X-Learner-Id header encoding".to_string()))?;
    let learner_id = raw.parse::<LearnerId>().map_err(AppError::Validation)?;
    Ok(Some(Learner(learner_id)))
}
