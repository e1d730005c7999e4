//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::extract::Request;
use axum::routing::{get, post};
use skillpath_observe::attrs;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::extractors::learner::LEARNER_HEADER;
use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Catalog and learner path views
        .route("/paths", get(handlers::paths::list_paths))
        .route("/paths/{id}", get(handlers::paths::get_path))
        .route(
            "/paths/{id}/recommendations",
            get(handlers::paths::recommendations),
        )
        // Skill transitions
        .route("/skills/{id}/start", post(handlers::skills::start_skill))
        .route(
            "/skills/{id}/progress",
            post(handlers::skills::update_progress),
        )
        .route(
            "/skills/{id}/complete",
            post(handlers::skills::complete_skill),
        )
        .route(
            "/skills/{id}/master",
            post(handlers::skills::promote_mastery),
        )
        // Learner-wide views
        .route(
            "/learner/achievements",
            get(handlers::learner::list_achievements),
        )
        .route("/learner/summary", get(handlers::learner::summary));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

fn request_span(request: &Request) -> tracing::Span {
    let learner = request
        .headers()
        .get(LEARNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    tracing::info_span!(
        "http request",
        { attrs::HTTP_METHOD } = %request.method(),
        { attrs::HTTP_ROUTE } = %request.uri().path(),
        { attrs::LEARNER_ID } = learner,
        { attrs::REQUEST_ID } = %uuid::Uuid::now_v7(),
    )
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode, header};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::state::tests::test_state;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        learner: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(learner) = learner {
            builder = builder.header(LEARNER_HEADER, learner);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let tmp = TempDir::new().unwrap();
        let app = build_router(test_state(&tmp).await);

        let (status, json) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_paths_and_catalog_view() {
        let tmp = TempDir::new().unwrap();
        let app = build_router(test_state(&tmp).await);

        let (status, json) = call(&app, Method::GET, "/api/v1/paths", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["id"], "intro-science");

        let (status, json) = call(&app, Method::GET, "/api/v1/paths/intro-science", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "not_started");
        assert_eq!(json["data"]["skills"][0]["is_locked"], false);
        assert_eq!(json["data"]["skills"][1]["is_locked"], true);
        assert_eq!(json["_links"]["self"], "/api/v1/paths/intro-science");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let tmp = TempDir::new().unwrap();
        let app = build_router(test_state(&tmp).await);

        let (status, json) = call(&app, Method::GET, "/api/v1/paths/nope", Some("ada"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["errors"][0]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_transitions_require_learner_header() {
        let tmp = TempDir::new().unwrap();
        let app = build_router(test_state(&tmp).await);

        let (status, json) =
            call(&app, Method::POST, "/api/v1/skills/matter-basics/start", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["code"], "LEARNER_REQUIRED");
    }

    #[tokio::test]
    async fn test_progression_flow_over_http() {
        let tmp = TempDir::new().unwrap();
        let app = build_router(test_state(&tmp).await);

        let (status, json) =
            call(&app, Method::POST, "/api/v1/skills/states-of-matter/start", Some("ada"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["errors"][0]["code"], "SKILL_LOCKED");
        assert_eq!(
            json["errors"][0]["details"]["missing_prerequisites"],
            json!(["matter-basics"])
        );

        let (status, json) =
            call(&app, Method::POST, "/api/v1/skills/matter-basics/start", Some("ada"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "in_progress");

        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/skills/matter-basics/progress",
            Some("ada"),
            Some(json!({ "percent": 150 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["code"], "VALIDATION_ERROR");

        let (status, json) = call(
            &app,
            Method::POST,
            "/api/v1/skills/matter-basics/progress",
            Some("ada"),
            Some(json!({ "percent": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["progress_percentage"], 50);
        assert_eq!(json["data"]["points_earned"], 5);

        let (status, json) =
            call(&app, Method::POST, "/api/v1/skills/matter-basics/complete", Some("ada"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["skill"]["status"], "completed");
        assert_eq!(json["data"]["unlocked_skills"], json!(["states-of-matter"]));
        assert_eq!(json["data"]["unlocked_achievements"][0]["id"], "first-steps");

        let (status, json) =
            call(&app, Method::POST, "/api/v1/skills/matter-basics/complete", Some("ada"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["errors"][0]["code"], "TERMINAL_STATE");

        let (status, json) =
            call(&app, Method::GET, "/api/v1/paths/intro-science", Some("ada"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["completed_skills"], 1);
        assert_eq!(json["data"]["progress_percentage"], 33);
        assert_eq!(json["data"]["status"], "in_progress");
        assert_eq!(json["data"]["skills"][1]["is_locked"], false);

        // Another learner sees an untouched path.
        let (_, json) =
            call(&app, Method::GET, "/api/v1/paths/intro-science", Some("grace"), None).await;
        assert_eq!(json["data"]["completed_skills"], 0);
    }

    #[tokio::test]
    async fn test_learner_views() {
        let tmp = TempDir::new().unwrap();
        let app = build_router(test_state(&tmp).await);

        call(&app, Method::POST, "/api/v1/skills/matter-basics/complete", Some("ada"), None).await;

        let (status, json) =
            call(&app, Method::GET, "/api/v1/learner/summary", Some("ada"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_points"], 10);
        assert_eq!(json["data"]["completed_skills"], 1);
        assert_eq!(json["data"]["unlocked_achievements"], 1);

        let (status, json) =
            call(&app, Method::GET, "/api/v1/learner/achievements", Some("ada"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["is_unlocked"], true);

        let (status, json) = call(
            &app,
            Method::GET,
            "/api/v1/paths/intro-science/recommendations?limit=1",
            Some("ada"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["skill_id"], "states-of-matter");
    }
}
