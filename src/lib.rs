pub mod cache;
pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::services::random::{RandomSource, SeededRandom, ThreadRandom};
use crate::state::AppState;
use crate::store::InMemoryGraphStore;

/// Builds the application state from config: an in-memory store (seeded
/// with the demo course unless disabled) and the matching random source.
pub fn build_state(config: &Config) -> AppState {
    let store = Arc::new(InMemoryGraphStore::new());
    if config.seed_demo_course {
        seed::seed_demo_course(&store);
    }

    let random: Arc<dyn RandomSource> = match config.jitter_seed {
        Some(seed) => {
            tracing::info!(seed, "using seeded ranking jitter");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(ThreadRandom),
    };

    AppState::new(store, random, config.engine_settings())
}

pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
