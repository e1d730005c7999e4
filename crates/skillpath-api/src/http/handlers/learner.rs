//! Learner-wide handlers.

use axum::Json;
use axum::extract::State;

use skillpath_types::achievement::Achievement;
use skillpath_types::learner::LearnerSummary;

use crate::http::error::AppError;
use crate::http::extractors::learner::Learner;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// GET /api/v1/learner/achievements - Every achievement with unlock state.
pub async fn list_achievements(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
) -> Result<Json<ApiResponse<Vec<Achievement>>>, AppError> {
    let clock = RequestClock::start();
    let achievements = state.progression.list_achievements(&learner_id).await?;
    Ok(Json(
        clock
            .success(achievements)
            .with_link("summary", "/api/v1/learner/summary"),
    ))
}

/// GET /api/v1/learner/summary - Totals across every path.
pub async fn summary(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
) -> Result<Json<ApiResponse<LearnerSummary>>, AppError> {
    let clock = RequestClock::start();
    let summary = state.progression.learner_summary(&learner_id).await?;
    Ok(Json(
        clock
            .success(summary)
            .with_link("achievements", "/api/v1/learner/achievements"),
    ))
}
