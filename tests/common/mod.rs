#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use graphlearn_engine::config::EngineSettings;
use graphlearn_engine::seed::seed_demo_course;
use graphlearn_engine::services::random::FixedRandom;
use graphlearn_engine::services::LearningEngine;
use graphlearn_engine::state::AppState;
use graphlearn_engine::store::{
    AchievementGrant, AggregateStats, CompletionRecord, Concept, ConceptInteraction, Difficulty,
    GraphStore, InMemoryGraphStore, InteractionRecord, LearnerTotal, PointAward, PrerequisiteEdge,
    StoreError,
};

pub fn demo_store() -> Arc<InMemoryGraphStore> {
    let store = Arc::new(InMemoryGraphStore::new());
    seed_demo_course(&store);
    store
}

pub fn engine_for(store: Arc<InMemoryGraphStore>) -> LearningEngine {
    LearningEngine::new(store, Arc::new(FixedRandom::neutral()), EngineSettings::default())
}

pub fn create_test_app() -> (Router, Arc<InMemoryGraphStore>) {
    let store = demo_store();
    (app_for(Arc::clone(&store)), store)
}

pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn get(uri: &str, learner: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(learner) = learner {
        builder = builder.header("X-Learner-Id", learner);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, learner: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(learner) = learner {
        builder = builder.header("X-Learner-Id", learner);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A store whose calls never complete, for exercising timeouts.
pub struct StalledStore;

#[async_trait]
impl GraphStore for StalledStore {
    async fn list_concepts(&self) -> Result<Vec<Concept>, StoreError> {
        std::future::pending().await
    }

    async fn list_prerequisite_edges(&self) -> Result<Vec<PrerequisiteEdge>, StoreError> {
        std::future::pending().await
    }

    async fn get_completed_set(&self, _: &str) -> Result<HashSet<String>, StoreError> {
        std::future::pending().await
    }

    async fn get_interaction_history(&self, _: &str) -> Result<Vec<InteractionRecord>, StoreError> {
        std::future::pending().await
    }

    async fn get_aggregate_stats(&self, _: &str) -> Result<AggregateStats, StoreError> {
        std::future::pending().await
    }

    async fn get_concept_interaction(
        &self,
        _: &str,
        _: &str,
    ) -> Result<Option<ConceptInteraction>, StoreError> {
        std::future::pending().await
    }

    async fn get_total_points(&self, _: &str) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn get_earned_achievements(&self, _: &str) -> Result<HashSet<String>, StoreError> {
        std::future::pending().await
    }

    async fn list_learner_totals(
        &self,
        _: Option<DateTime<Utc>>,
    ) -> Result<Vec<LearnerTotal>, StoreError> {
        std::future::pending().await
    }

    async fn record_completion(&self, _: &str, _: CompletionRecord) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn apply_point_award(&self, _: &str, _: PointAward) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn grant_achievement_with_reward(
        &self,
        _: &str,
        _: AchievementGrant,
    ) -> Result<Option<u64>, StoreError> {
        std::future::pending().await
    }

    async fn record_ai_interaction(&self, _: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn record_help(&self, _: &str, _: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

/// Delegates to an [`InMemoryGraphStore`] but can be told to fail every
/// achievement grant, leaving the rest of the store working.
pub struct GrantFailingStore {
    inner: Arc<InMemoryGraphStore>,
    fail_grants: AtomicBool,
}

impl GrantFailingStore {
    pub fn new(inner: Arc<InMemoryGraphStore>) -> Self {
        Self {
            inner,
            fail_grants: AtomicBool::new(true),
        }
    }

    pub fn set_fail_grants(&self, fail: bool) {
        self.fail_grants.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl GraphStore for GrantFailingStore {
    async fn list_concepts(&self) -> Result<Vec<Concept>, StoreError> {
        self.inner.list_concepts().await
    }

    async fn list_prerequisite_edges(&self) -> Result<Vec<PrerequisiteEdge>, StoreError> {
        self.inner.list_prerequisite_edges().await
    }

    async fn get_completed_set(&self, learner_id: &str) -> Result<HashSet<String>, StoreError> {
        self.inner.get_completed_set(learner_id).await
    }

    async fn get_interaction_history(
        &self,
        learner_id: &str,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.inner.get_interaction_history(learner_id).await
    }

    async fn get_aggregate_stats(&self, learner_id: &str) -> Result<AggregateStats, StoreError> {
        self.inner.get_aggregate_stats(learner_id).await
    }

    async fn get_concept_interaction(
        &self,
        learner_id: &str,
        concept_id: &str,
    ) -> Result<Option<ConceptInteraction>, StoreError> {
        self.inner.get_concept_interaction(learner_id, concept_id).await
    }

    async fn get_total_points(&self, learner_id: &str) -> Result<u64, StoreError> {
        self.inner.get_total_points(learner_id).await
    }

    async fn get_earned_achievements(
        &self,
        learner_id: &str,
    ) -> Result<HashSet<String>, StoreError> {
        self.inner.get_earned_achievements(learner_id).await
    }

    async fn list_learner_totals(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LearnerTotal>, StoreError> {
        self.inner.list_learner_totals(since).await
    }

    async fn record_completion(
        &self,
        learner_id: &str,
        completion: CompletionRecord,
    ) -> Result<(), StoreError> {
        self.inner.record_completion(learner_id, completion).await
    }

    async fn apply_point_award(
        &self,
        learner_id: &str,
        award: PointAward,
    ) -> Result<u64, StoreError> {
        self.inner.apply_point_award(learner_id, award).await
    }

    async fn grant_achievement_with_reward(
        &self,
        learner_id: &str,
        grant: AchievementGrant,
    ) -> Result<Option<u64>, StoreError> {
        if self.fail_grants.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("achievement write failed".to_string()));
        }
        self.inner.grant_achievement_with_reward(learner_id, grant).await
    }

    async fn record_ai_interaction(&self, learner_id: &str) -> Result<(), StoreError> {
        self.inner.record_ai_interaction(learner_id).await
    }

    async fn record_help(&self, helper_id: &str, helped_id: &str) -> Result<(), StoreError> {
        self.inner.record_help(helper_id, helped_id).await
    }
}

/// Two concepts that require each other.
pub fn cyclic_store() -> Arc<InMemoryGraphStore> {
    let store = Arc::new(InMemoryGraphStore::new());
    store.upsert_concept(Concept::new("a", "A", Difficulty::Beginner));
    store.upsert_concept(Concept::new("b", "B", Difficulty::Beginner));
    store.add_prerequisite("a", "b");
    store.add_prerequisite("b", "a");
    store
}

pub fn app_for(store: Arc<InMemoryGraphStore>) -> Router {
    let state = AppState::new(
        store as Arc<dyn GraphStore>,
        Arc::new(FixedRandom::neutral()),
        EngineSettings::default(),
    );
    graphlearn_engine::build_app(state)
}
