//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use skillpath_types::error::{GraphError, ProgressionError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from progression operations.
    Progression(ProgressionError),
    /// No `X-Learner-Id` header on a learner-scoped route.
    MissingLearner,
    /// Malformed request input.
    Validation(String),
}

impl From<ProgressionError> for AppError {
    fn from(e: ProgressionError) -> Self {
        AppError::Progression(e)
    }
}

impl AppError {
    /// HTTP status, machine-readable code and optional details.
    fn parts(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::Progression(err) => match err {
                ProgressionError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
                ProgressionError::SkillLocked { skill_id, missing } => (
                    StatusCode::CONFLICT,
                    "SKILL_LOCKED",
                    Some(json!({ "skill_id": skill_id, "missing_prerequisites": missing })),
                ),
                ProgressionError::AlreadyStarted { skill_id, status } => (
                    StatusCode::CONFLICT,
                    "ALREADY_STARTED",
                    Some(json!({ "skill_id": skill_id, "status": status })),
                ),
                ProgressionError::TerminalState { skill_id, status } => (
                    StatusCode::CONFLICT,
                    "TERMINAL_STATE",
                    Some(json!({ "skill_id": skill_id, "status": status })),
                ),
                ProgressionError::InvalidTransition { skill_id, from, to } => (
                    StatusCode::CONFLICT,
                    "INVALID_TRANSITION",
                    Some(json!({ "skill_id": skill_id, "from": from, "to": to })),
                ),
                ProgressionError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
                ProgressionError::Graph(graph) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    match graph {
                        GraphError::CycleDetected(_) => "GRAPH_CYCLE",
                        _ => "INVALID_PATH_GRAPH",
                    },
                    None,
                ),
                ProgressionError::Persistence(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_UNAVAILABLE", None)
                }
            },
            AppError::MissingLearner => (StatusCode::BAD_REQUEST, "LEARNER_REQUIRED", None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Progression(err) => err.to_string(),
            AppError::MissingLearner => {
                "Missing learner id. Provide it via the 'X-Learner-Id' header.".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(code, "request failed: {message}");
        } else {
            tracing::debug!(code, "request rejected: {message}");
        }

        let mut response = ApiResponse::error(code, &message, details, String::new(), 0).into_response();
        *response.status_mut() = status;
        response
    }
}
