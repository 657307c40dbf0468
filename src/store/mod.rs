//! Graph store boundary.
//!
//! The engine never owns persistent data. Concepts, prerequisite edges,
//! completion relations, interaction history and progression state all live
//! behind [`GraphStore`]; the engine only reads snapshots and issues the few
//! writes that progression needs.

pub mod memory;

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryGraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    /// Relative effort used for completion-time estimates.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Beginner => 1.0,
            Self::Intermediate => 1.5,
            Self::Advanced => 2.0,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Beginner
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
}

impl Concept {
    pub fn new(id: impl Into<String>, name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            difficulty,
        }
    }
}

/// `prerequisite` must be completed before `concept` becomes available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteEdge {
    pub prerequisite: String,
    pub concept: String,
}

impl PrerequisiteEdge {
    pub fn new(prerequisite: impl Into<String>, concept: impl Into<String>) -> Self {
        Self {
            prerequisite: prerequisite.into(),
            concept: concept.into(),
        }
    }
}

/// One append-only history entry. `timestamp` is kept as the raw ISO-8601
/// string so that malformed values reach the profile estimator intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub learner_id: String,
    pub concept_id: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub attempts: u32,
    pub time_spent_secs: u64,
    pub correctness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Accumulated learner↔concept interaction used by the mastery estimator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptInteraction {
    pub time_spent_secs: u64,
    pub attempts: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub concepts_completed: u32,
    pub concepts_today: u32,
    pub perfect_completions: u32,
    pub helped_others: u32,
    pub ai_interactions: u32,
    pub current_streak: u32,
    pub difficulty_mastered: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub concept_id: String,
    pub attempts: u32,
    pub time_spent_secs: u64,
    pub correct_answers: u32,
    pub total_questions: u32,
}

impl CompletionRecord {
    pub fn accuracy(&self) -> f64 {
        self.correct_answers as f64 / self.total_questions.max(1) as f64
    }
}

#[derive(Debug, Clone)]
pub struct PointAward {
    pub points: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AchievementGrant {
    pub achievement_id: String,
    pub name: String,
    pub reward: u64,
}

/// Points and completions for one learner, either all-time or counted from
/// a cutoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerTotal {
    pub learner_id: String,
    pub total_points: u64,
    pub completions: u32,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("graph store timed out after {0:?}")]
    Timeout(Duration),
    #[error("write rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn list_concepts(&self) -> Result<Vec<Concept>, StoreError>;

    async fn list_prerequisite_edges(&self) -> Result<Vec<PrerequisiteEdge>, StoreError>;

    async fn get_completed_set(&self, learner_id: &str) -> Result<HashSet<String>, StoreError>;

    /// History for one learner, most recent first.
    async fn get_interaction_history(
        &self,
        learner_id: &str,
    ) -> Result<Vec<InteractionRecord>, StoreError>;

    async fn get_aggregate_stats(&self, learner_id: &str) -> Result<AggregateStats, StoreError>;

    async fn get_concept_interaction(
        &self,
        learner_id: &str,
        concept_id: &str,
    ) -> Result<Option<ConceptInteraction>, StoreError>;

    async fn get_total_points(&self, learner_id: &str) -> Result<u64, StoreError>;

    async fn get_earned_achievements(&self, learner_id: &str)
        -> Result<HashSet<String>, StoreError>;

    /// With `since`, only learners who completed something at or after the
    /// cutoff are listed, and both points and completions count from it.
    async fn list_learner_totals(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LearnerTotal>, StoreError>;

    async fn record_completion(
        &self,
        learner_id: &str,
        completion: CompletionRecord,
    ) -> Result<(), StoreError>;

    /// Adds the points and appends the award log entry as one unit.
    /// Returns the new total.
    async fn apply_point_award(&self, learner_id: &str, award: PointAward)
        -> Result<u64, StoreError>;

    /// Records the achievement, adds its reward to the total and appends the
    /// reward's log entry as one unit. Returns the new total, or `None` when
    /// the learner already holds the achievement.
    async fn grant_achievement_with_reward(
        &self,
        learner_id: &str,
        grant: AchievementGrant,
    ) -> Result<Option<u64>, StoreError>;

    async fn record_ai_interaction(&self, learner_id: &str) -> Result<(), StoreError>;

    async fn record_help(&self, helper_id: &str, helped_id: &str) -> Result<(), StoreError>;
}
