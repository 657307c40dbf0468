use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::EngineSettings;
use crate::services::random::RandomSource;
use crate::services::LearningEngine;
use crate::store::GraphStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    store: Arc<dyn GraphStore>,
    engine: Arc<LearningEngine>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn GraphStore>,
        random: Arc<dyn RandomSource>,
        settings: EngineSettings,
    ) -> Self {
        let engine = Arc::new(LearningEngine::new(Arc::clone(&store), random, settings));
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            store,
            engine,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    pub fn engine(&self) -> Arc<LearningEngine> {
        Arc::clone(&self.engine)
    }
}
