//! Skill transition handlers.
//!
//! Each handler runs one progression transition for the learner named in the
//! `X-Learner-Id` header and returns the committed skill view.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use skillpath_core::service::CompletionOutcome;
use skillpath_types::skill::{SkillId, SkillSnapshot};

use crate::http::error::AppError;
use crate::http::extractors::learner::Learner;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// Body of a progress report.
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    /// 0-100. Out-of-range values are rejected by the service.
    pub percent: i32,
}

/// POST /api/v1/skills/{id}/start
pub async fn start_skill(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
    Path(skill_id): Path<String>,
) -> Result<Json<ApiResponse<SkillSnapshot>>, AppError> {
    let clock = RequestClock::start();
    let skill_id = parse_skill_id(&skill_id)?;
    let skill = state.progression.start_skill(&learner_id, &skill_id).await?;
    Ok(Json(with_skill_links(clock.success(skill), &skill_id)))
}

/// POST /api/v1/skills/{id}/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
    Path(skill_id): Path<String>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<ApiResponse<SkillSnapshot>>, AppError> {
    let clock = RequestClock::start();
    let skill_id = parse_skill_id(&skill_id)?;
    let skill = state
        .progression
        .update_skill_progress(&learner_id, &skill_id, body.percent)
        .await?;
    Ok(Json(with_skill_links(clock.success(skill), &skill_id)))
}

/// POST /api/v1/skills/{id}/complete
pub async fn complete_skill(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
    Path(skill_id): Path<String>,
) -> Result<Json<ApiResponse<CompletionOutcome>>, AppError> {
    let clock = RequestClock::start();
    let skill_id = parse_skill_id(&skill_id)?;
    let outcome = state
        .progression
        .complete_skill(&learner_id, &skill_id)
        .await?;
    let path_id = outcome.skill.learning_path_id.clone();
    let resp = with_skill_links(clock.success(outcome), &skill_id)
        .with_link("path", format!("/api/v1/paths/{path_id}"))
        .with_link("achievements", "/api/v1/learner/achievements");
    Ok(Json(resp))
}

/// POST /api/v1/skills/{id}/master - External mastery signal.
pub async fn promote_mastery(
    State(state): State<AppState>,
    Learner(learner_id): Learner,
    Path(skill_id): Path<String>,
) -> Result<Json<ApiResponse<SkillSnapshot>>, AppError> {
    let clock = RequestClock::start();
    let skill_id = parse_skill_id(&skill_id)?;
    let skill = state
        .progression
        .promote_mastery(&learner_id, &skill_id)
        .await?;
    Ok(Json(with_skill_links(clock.success(skill), &skill_id)))
}

fn parse_skill_id(raw: &str) -> Result<SkillId, AppError> {
    raw.parse::<SkillId>().map_err(AppError::Validation)
}

fn with_skill_links<T: serde::Serialize>(resp: ApiResponse<T>, skill_id: &SkillId) -> ApiResponse<T> {
    resp.with_link("start", format!("/api/v1/skills/{skill_id}/start"))
        .with_link("progress", format!("/api/v1/skills/{skill_id}/progress"))
        .with_link("complete", format!("/api/v1/skills/{skill_id}/complete"))
}
