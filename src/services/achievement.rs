use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::store::AggregateStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Milestone,
    Performance,
    Mastery,
    Consistency,
    Social,
    Engagement,
}

/// Predicate over a stats snapshot, with its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "threshold", rename_all = "snake_case")]
pub enum AchievementKind {
    ConceptsCompleted(u32),
    ConceptsToday(u32),
    PerfectCompletions(u32),
    DifficultyTiersMastered(u32),
    Streak(u32),
    HelpedOthers(u32),
    AiInteractions(u32),
}

impl AchievementKind {
    pub fn is_met(&self, stats: &AggregateStats) -> bool {
        self.current_value(stats) >= self.target()
    }

    pub fn current_value(&self, stats: &AggregateStats) -> u32 {
        match self {
            Self::ConceptsCompleted(_) => stats.concepts_completed,
            Self::ConceptsToday(_) => stats.concepts_today,
            Self::PerfectCompletions(_) => stats.perfect_completions,
            Self::DifficultyTiersMastered(_) => stats.difficulty_mastered,
            Self::Streak(_) => stats.current_streak,
            Self::HelpedOthers(_) => stats.helped_others,
            Self::AiInteractions(_) => stats.ai_interactions,
        }
    }

    pub fn target(&self) -> u32 {
        match *self {
            Self::ConceptsCompleted(n)
            | Self::ConceptsToday(n)
            | Self::PerfectCompletions(n)
            | Self::DifficultyTiersMastered(n)
            | Self::Streak(n)
            | Self::HelpedOthers(n)
            | Self::AiInteractions(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub points: u64,
    pub category: AchievementCategory,
    pub kind: AchievementKind,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_steps",
        name: "🚀 First Steps",
        description: "Complete your first concept",
        points: 100,
        category: AchievementCategory::Milestone,
        kind: AchievementKind::ConceptsCompleted(1),
    },
    Achievement {
        id: "speed_demon",
        name: "⚡ Speed Demon",
        description: "Complete 3 concepts in one day",
        points: 250,
        category: AchievementCategory::Performance,
        kind: AchievementKind::ConceptsToday(3),
    },
    Achievement {
        id: "perfectionist",
        name: "💎 Perfectionist",
        description: "Complete 5 concepts with 100% accuracy",
        points: 500,
        category: AchievementCategory::Mastery,
        kind: AchievementKind::PerfectCompletions(5),
    },
    Achievement {
        id: "knowledge_seeker",
        name: "🔍 Knowledge Seeker",
        description: "Complete 10 concepts",
        points: 300,
        category: AchievementCategory::Milestone,
        kind: AchievementKind::ConceptsCompleted(10),
    },
    Achievement {
        id: "master_learner",
        name: "🎓 Master Learner",
        description: "Complete all concepts in a difficulty level",
        points: 1000,
        category: AchievementCategory::Mastery,
        kind: AchievementKind::DifficultyTiersMastered(1),
    },
    Achievement {
        id: "streak_master",
        name: "🔥 Streak Master",
        description: "Maintain a 7-day learning streak",
        points: 750,
        category: AchievementCategory::Consistency,
        kind: AchievementKind::Streak(7),
    },
    Achievement {
        id: "collaboration_champion",
        name: "🤝 Collaboration Champion",
        description: "Help 5 other learners",
        points: 400,
        category: AchievementCategory::Social,
        kind: AchievementKind::HelpedOthers(5),
    },
    Achievement {
        id: "ai_whisperer",
        name: "🤖 AI Whisperer",
        description: "Use AI recommendations 10 times",
        points: 200,
        category: AchievementCategory::Engagement,
        kind: AchievementKind::AiInteractions(10),
    },
];

/// Achievements not in `earned` whose predicate now holds, in catalogue order.
pub fn newly_eligible(
    stats: &AggregateStats,
    earned: &HashSet<String>,
) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !earned.contains(a.id))
        .filter(|a| a.kind.is_met(stats))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub earned: bool,
    pub progress: f64,
}

pub fn catalogue_status(
    stats: &AggregateStats,
    earned: &HashSet<String>,
) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|a| {
            let is_earned = earned.contains(a.id);
            let progress = if is_earned || a.kind.target() == 0 {
                100.0
            } else {
                (a.kind.current_value(stats) as f64 / a.kind.target() as f64 * 100.0).min(100.0)
            };
            AchievementStatus {
                achievement: *a,
                earned: is_earned,
                progress,
            }
        })
        .collect()
}
