use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

const STORE_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_latency_ms: Option<u64>,
    concepts: usize,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

enum StoreCheck {
    Connected { latency_ms: u64, concepts: usize },
    Timeout,
    Unavailable,
}

async fn root(State(state): State<AppState>) -> Response {
    let (status_code, response) = match store_check(&state).await {
        StoreCheck::Connected {
            latency_ms,
            concepts,
        } => (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                store: "connected",
                store_latency_ms: Some(latency_ms),
                concepts,
                timestamp: now_iso(),
            },
        ),
        StoreCheck::Timeout => (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "degraded",
                store: "timeout",
                store_latency_ms: None,
                concepts: 0,
                timestamp: now_iso(),
            },
        ),
        StoreCheck::Unavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "degraded",
                store: "unavailable",
                store_latency_ms: None,
                concepts: 0,
                timestamp: now_iso(),
            },
        ),
    };

    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let start: chrono::DateTime<chrono::Utc> = state.started_at_system().into();
    Json(HealthInfoResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        start_time: start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn store_check(state: &AppState) -> StoreCheck {
    let store = state.store();
    let started = Instant::now();
    match tokio::time::timeout(STORE_PROBE_TIMEOUT, store.list_concepts()).await {
        Ok(Ok(concepts)) => StoreCheck::Connected {
            latency_ms: started.elapsed().as_millis() as u64,
            concepts: concepts.len(),
        },
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "health check: store unavailable");
            StoreCheck::Unavailable
        }
        Err(_) => StoreCheck::Timeout,
    }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
