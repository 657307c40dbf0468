use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::require_learner;
use crate::services::engine::Timeframe;
use crate::services::progression;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AwardPointsRequest {
    points: i64,
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HelpRequest {
    helped_learner_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct LeaderboardQuery {
    timeframe: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillTreesResponse {
    total_points: u64,
    level: progression::LevelInfo,
    trees: Vec<progression::SkillTreeProgress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordedResponse {
    recorded: bool,
}

pub(super) async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let profile = state.engine().get_profile(&learner).await?;
    Ok(ok(profile))
}

pub(super) async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let engine = state.engine();
    let recommendations = engine.get_recommendations(&learner).await?;

    if let Err(err) = engine.record_ai_interaction(&learner).await {
        tracing::warn!(learner_id = %learner, error = %err, "failed to record AI interaction");
    }

    Ok(ok(recommendations))
}

pub(super) async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let session = state
        .engine()
        .get_study_session(&learner)
        .await?
        .ok_or_else(|| AppError::not_found("No concepts are available to study"))?;
    Ok(ok(session))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let stats = state.engine().get_learner_stats(&learner).await?;
    Ok(ok(stats))
}

pub(super) async fn award_points(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AwardPointsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let outcome = state
        .engine()
        .award_points(&learner, payload.points, &payload.reason)
        .await?;
    Ok(ok(outcome))
}

pub(super) async fn achievements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let catalogue = state.engine().get_achievement_catalogue(&learner).await?;
    Ok(ok(catalogue))
}

pub(super) async fn check_achievements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let unlocked = state.engine().check_achievements(&learner).await?;
    Ok(ok(unlocked))
}

pub(super) async fn skill_trees(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let engine = state.engine();
    let stats = engine.get_learner_stats(&learner).await?;
    let trees = engine.get_skill_tree_progress(&learner).await?;
    Ok(ok(SkillTreesResponse {
        total_points: stats.total_points,
        level: progression::level_info(stats.total_points),
        trees,
    }))
}

pub(super) async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let timeframe = parse_timeframe(query.timeframe.as_deref())?;
    let board = state.engine().get_leaderboard(timeframe).await?;
    Ok(ok(board))
}

fn parse_timeframe(raw: Option<&str>) -> Result<Timeframe, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all_time") => Ok(Timeframe::AllTime),
        Some("weekly") => Ok(Timeframe::Weekly),
        Some(other) => Err(AppError::validation(format!(
            "unknown timeframe '{other}', expected 'all_time' or 'weekly'"
        ))),
    }
}

pub(super) async fn help(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<HelpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    state
        .engine()
        .record_help(&learner, payload.helped_learner_id.trim())
        .await?;
    Ok(ok(RecordedResponse { recorded: true }))
}
