//! Learning path handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use skillpath_types::learner::Recommendation;
use skillpath_types::path::{PathDefinition, PathId, PathSnapshot};

use crate::http::error::AppError;
use crate::http::extractors::learner::Learner;
use crate::http::extractors::query::RecommendQuery;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// GET /api/v1/paths - List every path in the catalog.
pub async fn list_paths(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PathDefinition>>>, AppError> {
    let clock = RequestClock::start();
    let paths = state.progression.list_paths().await?;
    Ok(Json(clock.success(paths).with_link("self", "/api/v1/paths")))
}

/// GET /api/v1/paths/{id} - A path with the learner's progress, or the
/// catalog view when no learner is named.
pub async fn get_path(
    State(state): State<AppState>,
    learner: Option<Learner>,
    Path(path_id): Path<String>,
) -> Result<Json<ApiResponse<PathSnapshot>>, AppError> {
    let clock = RequestClock::start();
    let path_id = parse_path_id(&path_id)?;

    let snapshot = match learner {
        Some(Learner(learner_id)) => {
            state
                .progression
                .get_path_snapshot(&learner_id, &path_id)
                .await?
        }
        None => state.progression.load_path(&path_id).await?,
    };

    let resp = clock
        .success(snapshot)
        .with_link("self", format!("/api/v1/paths/{path_id}"))
        .with_link(
            "recommendations",
            format!("/api/v1/paths/{path_id}/recommendations"),
        );
    Ok(Json(resp))
}

/// GET /api/v1/paths/{id}/recommendations - Suggested next skills.
pub async fn recommendations(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
    Path(path_id): Path<String>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<ApiResponse<Vec<Recommendation>>>, AppError> {
    let clock = RequestClock::start();
    let path_id = parse_path_id(&path_id)?;

    let suggestions = state
        .progression
        .recommend(&learner_id, &path_id, query.limit)
        .await?;

    let resp = clock
        .success(suggestions)
        .with_link("path", format!("/api/v1/paths/{path_id}"));
    Ok(Json(resp))
}

fn parse_path_id(raw: &str) -> Result<PathId, AppError> {
    raw.parse::<PathId>().map_err(AppError::Validation)
}
