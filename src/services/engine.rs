use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{keys, TtlCache};
use crate::config::EngineSettings;
use crate::services::achievement::{self, AchievementStatus};
use crate::services::content::{self, PersonalizedContent};
use crate::services::graph::{CourseGraph, DependencyGraph, PathEntry};
use crate::services::mastery::mastery_score;
use crate::services::profile::{estimate_profile, LearnerProfile, LearningStyle};
use crate::services::progression::{self, level_for_points, SkillTreeProgress};
use crate::services::random::RandomSource;
use crate::services::recommend::{rank_available, Recommendation};
use crate::services::EngineError;
use crate::store::{
    AchievementGrant, AggregateStats, CompletionRecord, Concept, GraphStore, PointAward,
    StoreError,
};

/// Initial evaluation plus one re-check after the rewards it paid out.
const MAX_ACHIEVEMENT_PASSES: usize = 2;
const LEADERBOARD_SIZE: usize = 10;
const WEEKLY_WINDOW_DAYS: i64 = 7;
/// Largest single award accepted.
pub const MAX_AWARD_POINTS: i64 = 1_000_000;
const MAX_ID_LEN: usize = 128;
const LOCK_TABLE_PRUNE_AT: usize = 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub id: String,
    pub name: String,
    pub points: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardOutcome {
    pub points_awarded: u64,
    pub new_total: u64,
    pub new_level: u32,
    pub level_up: bool,
    pub new_achievements: Vec<UnlockedAchievement>,
    /// The award committed but the achievement check did not finish;
    /// `check_achievements` picks up the rest.
    pub achievements_pending: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionInput {
    pub attempts: u32,
    #[serde(default)]
    pub time_spent_secs: u64,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_questions: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub concept_id: String,
    pub newly_available: Vec<String>,
    pub new_achievements: Vec<UnlockedAchievement>,
    pub achievements_pending: bool,
    pub progress: Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl Progress {
    fn of(graph: &DependencyGraph, completed: &HashSet<String>) -> Self {
        let total = graph.len();
        let done = graph
            .concepts()
            .iter()
            .filter(|c| completed.contains(&c.id))
            .count();
        let percentage = if total == 0 {
            0.0
        } else {
            done as f64 / total as f64 * 100.0
        };
        Self {
            completed: done,
            total,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDetails {
    #[serde(flatten)]
    pub concept: Concept,
    pub prerequisites: Vec<Concept>,
    pub dependents: Vec<Concept>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub learning_style: LearningStyle,
    pub concept: Recommendation,
    pub study_tips: Vec<&'static str>,
    pub practice_type: &'static str,
    pub session_length: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerStats {
    #[serde(flatten)]
    pub stats: AggregateStats,
    pub total_points: u64,
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    #[default]
    AllTime,
    Weekly,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub learner_id: String,
    pub total_points: u64,
    pub completions: u32,
    pub level: u32,
}

/// Result of one achievement evaluation. Grants made before a failure stay
/// committed, each with its reward.
#[derive(Debug, Default)]
struct AchievementPass {
    unlocked: Vec<UnlockedAchievement>,
    latest_total: Option<u64>,
    failure: Option<EngineError>,
}

/// One async mutex per learner id; progression writes for a learner run
/// one at a time while other learners proceed in parallel.
#[derive(Default)]
struct LearnerLocks {
    inner: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LearnerLocks {
    fn handle(&self, learner_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut table = self.inner.lock();
        if table.len() >= LOCK_TABLE_PRUNE_AT {
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(table.entry(learner_id.to_string()).or_default())
    }
}

pub struct LearningEngine {
    store: Arc<dyn GraphStore>,
    random: Arc<dyn RandomSource>,
    settings: EngineSettings,
    profile_cache: TtlCache,
    locks: LearnerLocks,
}

impl LearningEngine {
    pub fn new(
        store: Arc<dyn GraphStore>,
        random: Arc<dyn RandomSource>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            random,
            profile_cache: TtlCache::new(settings.profile_cache_ttl),
            settings,
            locks: LearnerLocks::default(),
        }
    }

    pub async fn get_profile(&self, learner_id: &str) -> Result<LearnerProfile, EngineError> {
        validate_id("learner id", learner_id)?;

        let key = keys::learner_profile_key(learner_id);
        if let Some(profile) = self.profile_cache.get::<LearnerProfile>(&key) {
            debug!(learner_id, "profile cache hit");
            return Ok(profile);
        }
        debug!(learner_id, "profile cache miss");

        let now = Utc::now();
        let history = match self.bounded(self.store.get_interaction_history(learner_id)).await {
            Ok(history) => history,
            Err(err) => {
                warn!(
                    learner_id,
                    error = %err,
                    "interaction history unavailable, using default profile"
                );
                return Ok(LearnerProfile::default_at(now));
            }
        };

        let profile = estimate_profile(&history, now, self.random.as_ref());
        self.profile_cache.set(&key, &profile);
        Ok(profile)
    }

    pub async fn get_recommendations(
        &self,
        learner_id: &str,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let profile = self.get_profile(learner_id).await?;
        let graph = self.read_graph().await?;
        let Some(completed) = self.read_completed(learner_id).await else {
            return Ok(Vec::new());
        };

        let recommendations = rank_available(
            &graph,
            &completed,
            &profile,
            self.random.as_ref(),
            self.settings.recommendation_limit,
        );
        debug!(learner_id, count = recommendations.len(), "recommendations ranked");
        Ok(recommendations)
    }

    pub async fn get_mastery_score(
        &self,
        learner_id: &str,
        concept_id: &str,
    ) -> Result<f64, EngineError> {
        validate_id("learner id", learner_id)?;
        validate_id("concept id", concept_id)?;

        let interaction = match self
            .bounded(self.store.get_concept_interaction(learner_id, concept_id))
            .await
        {
            Ok(interaction) => interaction,
            Err(err) => {
                warn!(
                    learner_id,
                    concept_id,
                    error = %err,
                    "concept interaction unavailable, mastery defaults to 0"
                );
                None
            }
        };
        Ok(mastery_score(interaction.as_ref()))
    }

    /// Adds `points` to the learner's total, then runs the achievement check
    /// under the same per-learner lock. A failed award is returned as an
    /// error; a failed check after a committed award is reported through
    /// `achievements_pending`.
    pub async fn award_points(
        &self,
        learner_id: &str,
        points: i64,
        reason: &str,
    ) -> Result<AwardOutcome, EngineError> {
        validate_id("learner id", learner_id)?;
        if points > MAX_AWARD_POINTS {
            return Err(EngineError::InvalidInput(format!(
                "points must not exceed {MAX_AWARD_POINTS}, got {points}"
            )));
        }
        let points = u64::try_from(points).map_err(|_| {
            EngineError::InvalidInput(format!("points must not be negative, got {points}"))
        })?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::InvalidInput("reason must not be blank".to_string()));
        }

        let lock = self.locks.handle(learner_id);
        let _guard = lock.lock().await;

        let previous_total = self.bounded(self.store.get_total_points(learner_id)).await?;
        let award = PointAward {
            points,
            reason: reason.to_string(),
        };
        let awarded_total = self
            .bounded(self.store.apply_point_award(learner_id, award))
            .await?;
        info!(learner_id, points, new_total = awarded_total, reason, "points awarded");

        let pass = self.evaluate_achievements_locked(learner_id).await;
        let new_total = pass.latest_total.unwrap_or(awarded_total);
        self.invalidate_profile(learner_id);

        let new_level = level_for_points(new_total);
        let level_up = new_level > level_for_points(previous_total);
        if level_up {
            info!(learner_id, new_level, "level up");
        }

        Ok(AwardOutcome {
            points_awarded: points,
            new_total,
            new_level,
            level_up,
            achievements_pending: pass.failure.is_some(),
            new_achievements: pass.unlocked,
        })
    }

    /// Grants whatever the learner now qualifies for. Safe to retry after a
    /// failure: grants already made are not repeated.
    pub async fn check_achievements(
        &self,
        learner_id: &str,
    ) -> Result<Vec<UnlockedAchievement>, EngineError> {
        validate_id("learner id", learner_id)?;

        let lock = self.locks.handle(learner_id);
        let _guard = lock.lock().await;

        let pass = self.evaluate_achievements_locked(learner_id).await;
        if !pass.unlocked.is_empty() {
            self.invalidate_profile(learner_id);
        }
        match pass.failure {
            Some(err) => Err(err),
            None => Ok(pass.unlocked),
        }
    }

    pub async fn get_skill_tree_progress(
        &self,
        learner_id: &str,
    ) -> Result<Vec<SkillTreeProgress>, EngineError> {
        validate_id("learner id", learner_id)?;
        let total = self.read_total_points(learner_id).await;
        Ok(progression::skill_tree_progress(total))
    }

    pub async fn complete_concept(
        &self,
        learner_id: &str,
        concept_id: &str,
        input: CompletionInput,
    ) -> Result<CompletionOutcome, EngineError> {
        validate_id("learner id", learner_id)?;
        validate_id("concept id", concept_id)?;
        if input.attempts == 0 {
            return Err(EngineError::InvalidInput("attempts must be at least 1".to_string()));
        }
        if input.correct_answers > input.total_questions {
            return Err(EngineError::InvalidInput(format!(
                "correct answers ({}) exceed total questions ({})",
                input.correct_answers, input.total_questions
            )));
        }

        let lock = self.locks.handle(learner_id);
        let _guard = lock.lock().await;

        let graph = self.load_graph().await?;
        if graph.concept(concept_id).is_none() {
            return Err(EngineError::NotFound(format!("concept {concept_id}")));
        }

        let mut completed = self.bounded(self.store.get_completed_set(learner_id)).await?;
        let available_before = graph.available_ids(&completed);

        let record = CompletionRecord {
            concept_id: concept_id.to_string(),
            attempts: input.attempts,
            time_spent_secs: input.time_spent_secs,
            correct_answers: input.correct_answers,
            total_questions: input.total_questions,
        };
        self.bounded(self.store.record_completion(learner_id, record))
            .await?;
        self.invalidate_profile(learner_id);
        info!(learner_id, concept_id, attempts = input.attempts, "concept completed");

        completed.insert(concept_id.to_string());
        let mut newly_available: Vec<String> = graph
            .available_ids(&completed)
            .difference(&available_before)
            .cloned()
            .collect();
        newly_available.sort();

        let pass = self.evaluate_achievements_locked(learner_id).await;

        Ok(CompletionOutcome {
            concept_id: concept_id.to_string(),
            newly_available,
            new_achievements: pass.unlocked,
            achievements_pending: pass.failure.is_some(),
            progress: Progress::of(&graph, &completed),
        })
    }

    pub async fn get_concept(&self, concept_id: &str) -> Result<ConceptDetails, EngineError> {
        validate_id("concept id", concept_id)?;
        let graph = self.read_graph().await?;
        let concept = graph
            .concept(concept_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("concept {concept_id}")))?;

        let lookup = |ids: &[String]| -> Vec<Concept> {
            ids.iter()
                .filter_map(|id| graph.concept(id).cloned())
                .collect()
        };

        Ok(ConceptDetails {
            prerequisites: lookup(graph.prerequisites(concept_id)),
            dependents: lookup(graph.dependents(concept_id)),
            concept,
        })
    }

    /// Course graph; completion flags are filled in when a learner is given.
    pub async fn get_graph(&self, learner_id: Option<&str>) -> Result<CourseGraph, EngineError> {
        let graph = self.read_graph().await?;
        let completed = match learner_id {
            Some(id) => {
                validate_id("learner id", id)?;
                self.read_completed(id).await.unwrap_or_default()
            }
            None => HashSet::new(),
        };
        Ok(graph.course_graph(&completed))
    }

    pub async fn get_learning_path(&self, learner_id: &str) -> Result<Vec<PathEntry>, EngineError> {
        validate_id("learner id", learner_id)?;
        let graph = self.read_graph().await?;
        let completed = self.read_completed(learner_id).await.unwrap_or_default();
        Ok(graph.learning_path(&completed))
    }

    pub async fn get_progress(&self, learner_id: &str) -> Result<Progress, EngineError> {
        validate_id("learner id", learner_id)?;
        let graph = self.read_graph().await?;
        let completed = self.read_completed(learner_id).await.unwrap_or_default();
        Ok(Progress::of(&graph, &completed))
    }

    pub async fn get_personalized_content(
        &self,
        learner_id: &str,
        concept_id: &str,
    ) -> Result<PersonalizedContent, EngineError> {
        validate_id("concept id", concept_id)?;
        let profile = self.get_profile(learner_id).await?;
        let graph = self.read_graph().await?;
        let concept = graph
            .concept(concept_id)
            .ok_or_else(|| EngineError::NotFound(format!("concept {concept_id}")))?;
        Ok(content::personalized_content(concept, profile.learning_style))
    }

    /// Top recommendation packaged with style-specific tips. `None` when
    /// nothing is available.
    pub async fn get_study_session(
        &self,
        learner_id: &str,
    ) -> Result<Option<StudySession>, EngineError> {
        let profile = self.get_profile(learner_id).await?;
        let Some(top) = self.get_recommendations(learner_id).await?.into_iter().next() else {
            return Ok(None);
        };

        let concept = Concept::new(top.id.clone(), top.name.clone(), top.difficulty);
        let content = content::personalized_content(&concept, profile.learning_style);

        Ok(Some(StudySession {
            learning_style: profile.learning_style,
            concept: top,
            study_tips: content.study_tips,
            practice_type: content.practice_type,
            session_length: profile.recommended_session_length,
        }))
    }

    pub async fn get_learner_stats(&self, learner_id: &str) -> Result<LearnerStats, EngineError> {
        validate_id("learner id", learner_id)?;
        let stats = self.read_stats(learner_id).await;
        let total_points = self.read_total_points(learner_id).await;
        let level = progression::level_info(total_points);

        Ok(LearnerStats {
            stats,
            total_points,
            level: level.level,
            xp: level.xp,
            xp_to_next_level: level.xp_to_next_level,
        })
    }

    pub async fn get_achievement_catalogue(
        &self,
        learner_id: &str,
    ) -> Result<Vec<AchievementStatus>, EngineError> {
        validate_id("learner id", learner_id)?;
        let stats = self.read_stats(learner_id).await;
        let earned = match self.bounded(self.store.get_earned_achievements(learner_id)).await {
            Ok(earned) => earned,
            Err(err) => {
                warn!(learner_id, error = %err, "earned achievements unavailable");
                HashSet::new()
            }
        };
        Ok(achievement::catalogue_status(&stats, &earned))
    }

    /// Top learners by points, ties broken by completions then id. The weekly
    /// board only counts the last seven days.
    pub async fn get_leaderboard(
        &self,
        timeframe: Timeframe,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let since = match timeframe {
            Timeframe::AllTime => None,
            Timeframe::Weekly => Some(Utc::now() - ChronoDuration::days(WEEKLY_WINDOW_DAYS)),
        };
        let mut totals = match self.bounded(self.store.list_learner_totals(since)).await {
            Ok(totals) => totals,
            Err(err) => {
                warn!(error = %err, "learner totals unavailable, leaderboard empty");
                return Ok(Vec::new());
            }
        };

        totals.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(b.completions.cmp(&a.completions))
                .then(a.learner_id.cmp(&b.learner_id))
        });

        Ok(totals
            .into_iter()
            .take(LEADERBOARD_SIZE)
            .enumerate()
            .map(|(i, t)| LeaderboardEntry {
                rank: i + 1,
                level: level_for_points(t.total_points),
                learner_id: t.learner_id,
                total_points: t.total_points,
                completions: t.completions,
            })
            .collect())
    }

    pub async fn record_ai_interaction(&self, learner_id: &str) -> Result<(), EngineError> {
        validate_id("learner id", learner_id)?;
        self.bounded(self.store.record_ai_interaction(learner_id))
            .await?;
        self.invalidate_profile(learner_id);
        Ok(())
    }

    pub async fn record_help(&self, helper_id: &str, helped_id: &str) -> Result<(), EngineError> {
        validate_id("learner id", helper_id)?;
        validate_id("helped learner id", helped_id)?;
        if helper_id == helped_id {
            return Err(EngineError::InvalidInput(
                "a learner cannot help themselves".to_string(),
            ));
        }
        self.bounded(self.store.record_help(helper_id, helped_id))
            .await?;
        info!(helper_id, helped_id, "help recorded");
        Ok(())
    }

    /// Grants every newly eligible achievement together with its reward.
    /// Must be called with the learner's lock held.
    async fn evaluate_achievements_locked(&self, learner_id: &str) -> AchievementPass {
        let mut pass = AchievementPass::default();
        if let Err(err) = self.grant_eligible(learner_id, &mut pass).await {
            warn!(
                learner_id,
                error = %err,
                granted = pass.unlocked.len(),
                "achievement check did not finish"
            );
            pass.failure = Some(err);
        }
        pass
    }

    async fn grant_eligible(
        &self,
        learner_id: &str,
        pass: &mut AchievementPass,
    ) -> Result<(), EngineError> {
        for _ in 0..MAX_ACHIEVEMENT_PASSES {
            let stats = self.bounded(self.store.get_aggregate_stats(learner_id)).await?;
            let earned = self
                .bounded(self.store.get_earned_achievements(learner_id))
                .await?;
            let eligible = achievement::newly_eligible(&stats, &earned);
            if eligible.is_empty() {
                break;
            }

            for candidate in eligible {
                let grant = AchievementGrant {
                    achievement_id: candidate.id.to_string(),
                    name: candidate.name.to_string(),
                    reward: candidate.points,
                };
                let Some(new_total) = self
                    .bounded(self.store.grant_achievement_with_reward(learner_id, grant))
                    .await?
                else {
                    continue;
                };
                info!(
                    learner_id,
                    achievement = candidate.id,
                    points = candidate.points,
                    new_total,
                    "achievement granted"
                );

                pass.latest_total = Some(new_total);
                pass.unlocked.push(UnlockedAchievement {
                    id: candidate.id.to_string(),
                    name: candidate.name.to_string(),
                    points: candidate.points,
                });
            }
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.settings.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.settings.store_timeout)),
        }
    }

    async fn load_graph(&self) -> Result<DependencyGraph, EngineError> {
        let concepts = self.bounded(self.store.list_concepts()).await?;
        let edges = self.bounded(self.store.list_prerequisite_edges()).await?;
        let graph = DependencyGraph::build(concepts, &edges);

        if let Err(err) = graph.ensure_acyclic() {
            error!(error = %err, "prerequisite graph is not acyclic");
            return Err(err);
        }
        Ok(graph)
    }

    /// Read-path graph load: an unreachable store yields an empty graph, a
    /// cycle still fails the request.
    async fn read_graph(&self) -> Result<DependencyGraph, EngineError> {
        match self.load_graph().await {
            Ok(graph) => Ok(graph),
            Err(EngineError::StoreUnavailable(reason)) => {
                warn!(%reason, "concept graph unavailable, using empty graph");
                Ok(DependencyGraph::default())
            }
            Err(err) => Err(err),
        }
    }

    async fn read_completed(&self, learner_id: &str) -> Option<HashSet<String>> {
        match self.bounded(self.store.get_completed_set(learner_id)).await {
            Ok(completed) => Some(completed),
            Err(err) => {
                warn!(learner_id, error = %err, "completed set unavailable");
                None
            }
        }
    }

    async fn read_stats(&self, learner_id: &str) -> AggregateStats {
        match self.bounded(self.store.get_aggregate_stats(learner_id)).await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(learner_id, error = %err, "aggregate stats unavailable, using zero stats");
                AggregateStats::default()
            }
        }
    }

    async fn read_total_points(&self, learner_id: &str) -> u64 {
        match self.bounded(self.store.get_total_points(learner_id)).await {
            Ok(total) => total,
            Err(err) => {
                warn!(learner_id, error = %err, "total points unavailable, using 0");
                0
            }
        }
    }

    fn invalidate_profile(&self, learner_id: &str) {
        self.profile_cache
            .delete(&keys::learner_profile_key(learner_id));
    }
}

/// Ids are 1..=128 chars of ASCII alphanumerics or `-_.@`.
pub fn validate_id(label: &str, id: &str) -> Result<(), EngineError> {
    if id.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    if id.len() > MAX_ID_LEN {
        return Err(EngineError::InvalidInput(format!(
            "{label} exceeds {MAX_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
    {
        return Err(EngineError::InvalidInput(format!(
            "{label} contains unsupported characters"
        )));
    }
    Ok(())
}
