use std::collections::HashSet;

use serde::Serialize;

use crate::services::graph::DependencyGraph;
use crate::services::profile::{DifficultyPreference, LearnerProfile, Pace};
use crate::services::random::RandomSource;
use crate::store::{Concept, Difficulty};

pub const MAX_RECOMMENDATIONS: usize = 5;

const JITTER_LOW: f64 = 0.8;
const JITTER_HIGH: f64 = 1.2;
const BASE_MINUTES: f64 = 20.0;
const MAX_SUCCESS_PREDICTION: f64 = 0.95;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub completed: bool,
    pub ai_score: f64,
    pub estimated_time: u32,
    pub mastery_prediction: f64,
}

/// Deterministic part of the score; jitter is applied by the caller.
pub fn base_score(concept: &Concept, profile: &LearnerProfile) -> f64 {
    let difficulty_match = match (profile.difficulty_preference, concept.difficulty) {
        (DifficultyPreference::Challenging, Difficulty::Advanced) => 1.5,
        (DifficultyPreference::Gentle, Difficulty::Beginner) => 1.3,
        _ => 1.0,
    };
    let confidence_factor = profile.confidence_level / 100.0;
    let pace_factor = if profile.optimal_pace == Pace::Fast { 1.2 } else { 1.0 };

    difficulty_match * confidence_factor * pace_factor
}

/// Minutes, truncated.
pub fn estimate_completion_minutes(difficulty: Difficulty, pace: Pace) -> u32 {
    let base = difficulty.weight() * BASE_MINUTES;
    let scaled = match pace {
        Pace::Fast => base * 0.7,
        Pace::Slow => base * 1.5,
        Pace::Moderate => base,
    };
    scaled as u32
}

pub fn predict_mastery_success(difficulty: Difficulty, profile: &LearnerProfile) -> f64 {
    let base = match difficulty {
        Difficulty::Beginner => 0.9,
        Difficulty::Intermediate => 0.7,
        Difficulty::Advanced => 0.5,
    };
    (base + (profile.confidence_level - 50.0) / 100.0).min(MAX_SUCCESS_PREDICTION)
}

/// Scores every available concept and returns the best `limit` (at most
/// [`MAX_RECOMMENDATIONS`]), highest score first. An empty result is normal.
pub fn rank_available(
    graph: &DependencyGraph,
    completed: &HashSet<String>,
    profile: &LearnerProfile,
    random: &dyn RandomSource,
    limit: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = graph
        .available(completed)
        .into_iter()
        .map(|concept| Recommendation {
            id: concept.id.clone(),
            name: concept.name.clone(),
            difficulty: concept.difficulty,
            completed: false,
            ai_score: base_score(concept, profile) * random.uniform(JITTER_LOW, JITTER_HIGH),
            estimated_time: estimate_completion_minutes(concept.difficulty, profile.optimal_pace),
            mastery_prediction: predict_mastery_success(concept.difficulty, profile),
        })
        .collect();

    scored.sort_by(|a, b| b.ai_score.total_cmp(&a.ai_score));
    scored.truncate(limit.min(MAX_RECOMMENDATIONS));
    scored
}
