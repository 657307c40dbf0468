use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::random::RandomSource;
use crate::store::{Difficulty, InteractionRecord};

const RETENTION_DECAY_DAYS: f64 = 7.0;
const UNDATED_RETENTION_WEIGHT: f64 = 0.8;
const MAX_CONFIDENCE: f64 = 95.0;
const FAST_ATTEMPTS: f64 = 1.5;
const SLOW_ATTEMPTS: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Fast,
    Moderate,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyPreference {
    Challenging,
    Progressive,
    Gentle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub learning_style: LearningStyle,
    pub retention_score: f64,
    pub optimal_pace: Pace,
    pub difficulty_preference: DifficultyPreference,
    pub avg_attempts: f64,
    pub total_concepts_completed: usize,
    pub confidence_level: f64,
    pub recommended_session_length: u32,
    pub next_optimal_study_time: DateTime<Utc>,
}

impl LearnerProfile {
    /// Profile for a learner with no history.
    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self {
            learning_style: LearningStyle::Visual,
            retention_score: 0.7,
            optimal_pace: Pace::Moderate,
            difficulty_preference: DifficultyPreference::Progressive,
            avg_attempts: 1.5,
            total_concepts_completed: 0,
            confidence_level: 50.0,
            recommended_session_length: 30,
            next_optimal_study_time: now + Duration::hours(24),
        }
    }
}

/// Builds a profile from history (most recent first).
pub fn estimate_profile(
    history: &[InteractionRecord],
    now: DateTime<Utc>,
    random: &dyn RandomSource,
) -> LearnerProfile {
    if history.is_empty() {
        return LearnerProfile::default_at(now);
    }

    let avg_attempts = average_attempts(history);
    let retention_score = retention_score(history, now);

    LearnerProfile {
        learning_style: detect_learning_style(history, random),
        retention_score,
        optimal_pace: pace_for(avg_attempts),
        difficulty_preference: difficulty_preference(history),
        avg_attempts,
        total_concepts_completed: history.len(),
        confidence_level: (retention_score * 100.0).min(MAX_CONFIDENCE),
        recommended_session_length: session_length_for(avg_attempts),
        next_optimal_study_time: next_study_time(history, now),
    }
}

/// Accepts RFC 3339 as well as naive ISO-8601 (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn days_since(ts: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - ts).num_days().max(0)
}

fn average_attempts(history: &[InteractionRecord]) -> f64 {
    let total: u64 = history.iter().map(|h| h.attempts.max(1) as u64).sum();
    total as f64 / history.len() as f64
}

fn retention_score(history: &[InteractionRecord], now: DateTime<Utc>) -> f64 {
    let sum: f64 = history
        .iter()
        .map(|h| {
            match h.timestamp.as_deref().and_then(parse_timestamp) {
                Some(ts) => (-(days_since(ts, now) as f64) / RETENTION_DECAY_DAYS).exp(),
                None => UNDATED_RETENTION_WEIGHT,
            }
        })
        .sum();
    (sum / history.len() as f64).min(1.0)
}

fn detect_learning_style(
    history: &[InteractionRecord],
    random: &dyn RandomSource,
) -> LearningStyle {
    let quick = history.iter().filter(|h| h.attempts == 1).count();
    let ratio = quick as f64 / history.len() as f64;

    if ratio > 0.7 {
        LearningStyle::Visual
    } else if ratio < 0.3 {
        LearningStyle::Kinesthetic
    } else if random.coin() {
        LearningStyle::Auditory
    } else {
        LearningStyle::Reading
    }
}

fn pace_for(avg_attempts: f64) -> Pace {
    if avg_attempts < FAST_ATTEMPTS {
        Pace::Fast
    } else if avg_attempts > SLOW_ATTEMPTS {
        Pace::Slow
    } else {
        Pace::Moderate
    }
}

fn session_length_for(avg_attempts: f64) -> u32 {
    match pace_for(avg_attempts) {
        Pace::Fast => 45,
        Pace::Slow => 20,
        Pace::Moderate => 30,
    }
}

fn difficulty_preference(history: &[InteractionRecord]) -> DifficultyPreference {
    let advanced = history
        .iter()
        .filter(|h| h.difficulty == Difficulty::Advanced)
        .count();
    let ratio = advanced as f64 / history.len() as f64;

    if ratio > 0.5 {
        DifficultyPreference::Challenging
    } else if ratio < 0.2 {
        DifficultyPreference::Gentle
    } else {
        DifficultyPreference::Progressive
    }
}

fn next_study_time(history: &[InteractionRecord], now: DateTime<Utc>) -> DateTime<Utc> {
    let days = history
        .iter()
        .filter_map(|h| h.timestamp.as_deref().and_then(parse_timestamp))
        .max()
        .map(|latest| days_since(latest, now))
        .unwrap_or(0);

    if days < 1 {
        now + Duration::hours(12)
    } else if days < 3 {
        now + Duration::hours(24)
    } else {
        // overdue: review soon
        now + Duration::hours(6)
    }
}
