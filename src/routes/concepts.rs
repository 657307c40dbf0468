use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::response::{ok, AppError};
use crate::routes::{optional_learner, require_learner};
use crate::services::engine::CompletionInput;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MasteryResponse {
    concept_id: String,
    mastery: f64,
}

pub(super) async fn graph(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = optional_learner(&headers);
    let graph = state.engine().get_graph(learner.as_deref()).await?;
    Ok(ok(graph))
}

pub(super) async fn details(
    State(state): State<AppState>,
    Path(concept_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.engine().get_concept(&concept_id).await?;
    Ok(ok(details))
}

pub(super) async fn learning_path(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let path = state.engine().get_learning_path(&learner).await?;
    Ok(ok(path))
}

pub(super) async fn progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let progress = state.engine().get_progress(&learner).await?;
    Ok(ok(progress))
}

pub(super) async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(concept_id): Path<String>,
    Json(payload): Json<CompletionInput>,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let outcome = state
        .engine()
        .complete_concept(&learner, &concept_id, payload)
        .await?;
    Ok(ok(outcome))
}

pub(super) async fn mastery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(concept_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let mastery = state
        .engine()
        .get_mastery_score(&learner, &concept_id)
        .await?;
    Ok(ok(MasteryResponse {
        concept_id,
        mastery,
    }))
}

pub(super) async fn content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(concept_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner = require_learner(&headers)?;
    let content = state
        .engine()
        .get_personalized_content(&learner, &concept_id)
        .await?;
    Ok(ok(content))
}
