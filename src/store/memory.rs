use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use super::{
    AchievementGrant, AggregateStats, CompletionRecord, Concept, ConceptInteraction, Difficulty,
    GraphStore, InteractionRecord, LearnerTotal, PointAward, PrerequisiteEdge, StoreError,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointLogEntry {
    pub id: String,
    pub points: u64,
    pub reason: String,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedAchievement {
    pub id: String,
    pub achievement_id: String,
    pub name: String,
    pub reward: u64,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CompletionEntry {
    accuracy: f64,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LearnerData {
    completions: HashMap<String, CompletionEntry>,
    history: Vec<InteractionRecord>,
    interactions: HashMap<String, ConceptInteraction>,
    activity_days: BTreeSet<NaiveDate>,
    total_points: u64,
    point_log: Vec<PointLogEntry>,
    achievements: HashMap<String, EarnedAchievement>,
    ai_interactions: u32,
    helped: HashSet<String>,
}

impl LearnerData {
    /// Adds to the total and appends the log entry; neither happens on
    /// overflow.
    fn add_points(
        &mut self,
        points: u64,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let new_total = self.total_points.checked_add(points).ok_or_else(|| {
            StoreError::Rejected(format!(
                "adding {points} points would overflow the total of {}",
                self.total_points
            ))
        })?;

        self.point_log.push(PointLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            points,
            reason,
            awarded_at: at,
        });
        self.total_points = new_total;
        Ok(new_total)
    }

    /// Points and completions from `since` on, `None` without a completion
    /// in the window.
    fn activity_since(&self, since: DateTime<Utc>) -> Option<(u64, u32)> {
        let completions = self
            .completions
            .values()
            .filter(|c| c.completed_at >= since)
            .count() as u32;
        if completions == 0 {
            return None;
        }
        let total_points = self
            .point_log
            .iter()
            .filter(|entry| entry.awarded_at >= since)
            .fold(0u64, |sum, entry| sum.saturating_add(entry.points));
        Some((total_points, completions))
    }
}

#[derive(Debug, Default)]
struct Inner {
    concepts: Vec<Concept>,
    edges: Vec<PrerequisiteEdge>,
    learners: HashMap<String, LearnerData>,
}

impl Inner {
    fn difficulty_of(&self, concept_id: &str) -> Option<Difficulty> {
        self.concepts
            .iter()
            .find(|c| c.id == concept_id)
            .map(|c| c.difficulty)
    }
}

/// Process-local [`GraphStore`]. Backs the server binary and the tests.
#[derive(Debug)]
pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
    available: AtomicBool,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates an outage: every call fails with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn upsert_concept(&self, concept: Concept) {
        let mut inner = self.inner.write();
        match inner.concepts.iter_mut().find(|c| c.id == concept.id) {
            Some(existing) => *existing = concept,
            None => inner.concepts.push(concept),
        }
    }

    pub fn add_prerequisite(&self, prerequisite: &str, concept: &str) {
        let edge = PrerequisiteEdge::new(prerequisite, concept);
        let mut inner = self.inner.write();
        if !inner.edges.contains(&edge) {
            inner.edges.push(edge);
        }
    }

    /// Appends a raw history entry without touching completions.
    pub fn push_history(&self, record: InteractionRecord) {
        let mut inner = self.inner.write();
        inner
            .learners
            .entry(record.learner_id.clone())
            .or_default()
            .history
            .push(record);
    }

    pub fn point_log(&self, learner_id: &str) -> Vec<PointLogEntry> {
        self.inner
            .read()
            .learners
            .get(learner_id)
            .map(|l| l.point_log.clone())
            .unwrap_or_default()
    }

    pub fn earned_achievements(&self, learner_id: &str) -> Vec<EarnedAchievement> {
        let inner = self.inner.read();
        let mut earned: Vec<EarnedAchievement> = inner
            .learners
            .get(learner_id)
            .map(|l| l.achievements.values().cloned().collect())
            .unwrap_or_default();
        earned.sort_by(|a, b| a.earned_at.cmp(&b.earned_at));
        earned
    }

    /// Records a completion as if it happened at `at`.
    pub fn record_completion_at(
        &self,
        learner_id: &str,
        completion: CompletionRecord,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut inner = self.inner.write();
        let difficulty = inner
            .difficulty_of(&completion.concept_id)
            .ok_or_else(|| StoreError::NotFound(format!("concept {}", completion.concept_id)))?;

        let learner = inner.learners.entry(learner_id.to_string()).or_default();
        let accuracy = completion.accuracy();

        learner
            .completions
            .entry(completion.concept_id.clone())
            .and_modify(|entry| entry.accuracy = entry.accuracy.max(accuracy))
            .or_insert(CompletionEntry {
                accuracy,
                completed_at: at,
            });

        let aggregate = learner
            .interactions
            .entry(completion.concept_id.clone())
            .or_default();
        aggregate.time_spent_secs += completion.time_spent_secs;
        aggregate.attempts += completion.attempts;
        aggregate.correct_answers += completion.correct_answers;
        aggregate.total_questions += completion.total_questions;

        learner.history.push(InteractionRecord {
            learner_id: learner_id.to_string(),
            concept_id: completion.concept_id,
            difficulty,
            attempts: completion.attempts,
            time_spent_secs: completion.time_spent_secs,
            correctness: accuracy,
            timestamp: Some(at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        });
        learner.activity_days.insert(at.date_naive());

        Ok(())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".to_string()))
        }
    }

    fn compute_stats(inner: &Inner, learner: &LearnerData, today: NaiveDate) -> AggregateStats {
        let concepts_today = learner
            .completions
            .values()
            .filter(|c| c.completed_at.date_naive() == today)
            .count() as u32;
        let perfect_completions = learner
            .completions
            .values()
            .filter(|c| c.accuracy >= 1.0)
            .count() as u32;

        let difficulty_mastered = Difficulty::ALL
            .iter()
            .filter(|&&tier| {
                let mut tier_concepts = inner.concepts.iter().filter(|c| c.difficulty == tier);
                let mut any = false;
                let all_done = tier_concepts.all(|c| {
                    any = true;
                    learner.completions.contains_key(&c.id)
                });
                any && all_done
            })
            .count() as u32;

        AggregateStats {
            concepts_completed: learner.completions.len() as u32,
            concepts_today,
            perfect_completions,
            helped_others: learner.helped.len() as u32,
            ai_interactions: learner.ai_interactions,
            current_streak: consecutive_days(&learner.activity_days, today),
            difficulty_mastered,
        }
    }
}

/// Length of the run of consecutive active days ending today or yesterday.
fn consecutive_days(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&latest) = days.iter().next_back() else {
        return 0;
    };
    if latest != today && latest != today - Duration::days(1) {
        return 0;
    }

    let mut streak = 1u32;
    let mut expected = latest - Duration::days(1);
    for &day in days.iter().rev().skip(1) {
        if day == expected {
            streak += 1;
            expected = day - Duration::days(1);
        } else {
            break;
        }
    }
    streak
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn list_concepts(&self) -> Result<Vec<Concept>, StoreError> {
        self.ensure_available()?;
        Ok(self.inner.read().concepts.clone())
    }

    async fn list_prerequisite_edges(&self) -> Result<Vec<PrerequisiteEdge>, StoreError> {
        self.ensure_available()?;
        Ok(self.inner.read().edges.clone())
    }

    async fn get_completed_set(&self, learner_id: &str) -> Result<HashSet<String>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .read()
            .learners
            .get(learner_id)
            .map(|l| l.completions.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_interaction_history(
        &self,
        learner_id: &str,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .read()
            .learners
            .get(learner_id)
            .map(|l| l.history.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_aggregate_stats(&self, learner_id: &str) -> Result<AggregateStats, StoreError> {
        self.ensure_available()?;
        let inner = self.inner.read();
        Ok(inner
            .learners
            .get(learner_id)
            .map(|l| Self::compute_stats(&inner, l, Utc::now().date_naive()))
            .unwrap_or_default())
    }

    async fn get_concept_interaction(
        &self,
        learner_id: &str,
        concept_id: &str,
    ) -> Result<Option<ConceptInteraction>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .read()
            .learners
            .get(learner_id)
            .and_then(|l| l.interactions.get(concept_id).cloned()))
    }

    async fn get_total_points(&self, learner_id: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .read()
            .learners
            .get(learner_id)
            .map(|l| l.total_points)
            .unwrap_or(0))
    }

    async fn get_earned_achievements(
        &self,
        learner_id: &str,
    ) -> Result<HashSet<String>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .read()
            .learners
            .get(learner_id)
            .map(|l| l.achievements.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_learner_totals(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LearnerTotal>, StoreError> {
        self.ensure_available()?;
        let inner = self.inner.read();
        let totals = inner.learners.iter().filter_map(|(id, l)| {
            let (total_points, completions) = match since {
                Some(cutoff) => l.activity_since(cutoff)?,
                None => (l.total_points, l.completions.len() as u32),
            };
            Some(LearnerTotal {
                learner_id: id.clone(),
                total_points,
                completions,
            })
        });
        Ok(totals.collect())
    }

    async fn record_completion(
        &self,
        learner_id: &str,
        completion: CompletionRecord,
    ) -> Result<(), StoreError> {
        self.record_completion_at(learner_id, completion, Utc::now())
    }

    async fn apply_point_award(
        &self,
        learner_id: &str,
        award: PointAward,
    ) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut inner = self.inner.write();
        inner
            .learners
            .entry(learner_id.to_string())
            .or_default()
            .add_points(award.points, award.reason, Utc::now())
    }

    async fn grant_achievement_with_reward(
        &self,
        learner_id: &str,
        grant: AchievementGrant,
    ) -> Result<Option<u64>, StoreError> {
        self.ensure_available()?;
        let mut inner = self.inner.write();
        let learner = inner.learners.entry(learner_id.to_string()).or_default();
        if learner.achievements.contains_key(&grant.achievement_id) {
            return Ok(None);
        }

        let now = Utc::now();
        let reason = format!("Achievement unlocked: {}", grant.name);
        let new_total = learner.add_points(grant.reward, reason, now)?;
        learner.achievements.insert(
            grant.achievement_id.clone(),
            EarnedAchievement {
                id: uuid::Uuid::new_v4().to_string(),
                achievement_id: grant.achievement_id,
                name: grant.name,
                reward: grant.reward,
                earned_at: now,
            },
        );
        Ok(Some(new_total))
    }

    async fn record_ai_interaction(&self, learner_id: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut inner = self.inner.write();
        inner
            .learners
            .entry(learner_id.to_string())
            .or_default()
            .ai_interactions += 1;
        Ok(())
    }

    async fn record_help(&self, helper_id: &str, helped_id: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut inner = self.inner.write();
        inner
            .learners
            .entry(helper_id.to_string())
            .or_default()
            .helped
            .insert(helped_id.to_string());
        Ok(())
    }
}
