mod concepts;
mod health;
mod learners;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub const LEARNER_HEADER: &str = "x-learner-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/graph", get(concepts::graph).fallback(fallback_handler))
        .route("/api/concepts/:id", get(concepts::details).fallback(fallback_handler))
        .route(
            "/api/concepts/:id/complete",
            post(concepts::complete).fallback(fallback_handler),
        )
        .route(
            "/api/concepts/:id/mastery",
            get(concepts::mastery).fallback(fallback_handler),
        )
        .route(
            "/api/concepts/:id/content",
            get(concepts::content).fallback(fallback_handler),
        )
        .route(
            "/api/learning-path",
            get(concepts::learning_path).fallback(fallback_handler),
        )
        .route("/api/progress", get(concepts::progress).fallback(fallback_handler))
        .route("/api/profile", get(learners::profile).fallback(fallback_handler))
        .route(
            "/api/recommendations",
            get(learners::recommendations).fallback(fallback_handler),
        )
        .route("/api/session", get(learners::session).fallback(fallback_handler))
        .route("/api/stats", get(learners::stats).fallback(fallback_handler))
        .route("/api/points", post(learners::award_points).fallback(fallback_handler))
        .route(
            "/api/achievements",
            get(learners::achievements).fallback(fallback_handler),
        )
        .route(
            "/api/achievements/check",
            post(learners::check_achievements).fallback(fallback_handler),
        )
        .route(
            "/api/skill-trees",
            get(learners::skill_trees).fallback(fallback_handler),
        )
        .route(
            "/api/leaderboard",
            get(learners::leaderboard).fallback(fallback_handler),
        )
        .route("/api/help", post(learners::help).fallback(fallback_handler))
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Learner id from the `X-Learner-Id` header. Format checks happen in the
/// engine; this only rejects a missing or blank header.
pub(crate) fn require_learner(headers: &HeaderMap) -> Result<String, AppError> {
    optional_learner(headers)
        .ok_or_else(|| AppError::unauthorized("X-Learner-Id header is required"))
}

pub(crate) fn optional_learner(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LEARNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
