use serde::Serialize;

const POINTS_PER_LEVEL_UNIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
}

/// Points required to reach `level` (level 1 starts at 0).
pub fn points_for_level(level: u32) -> u64 {
    let steps = level.saturating_sub(1) as u64;
    steps
        .saturating_mul(steps)
        .saturating_mul(POINTS_PER_LEVEL_UNIT)
}

/// `floor(sqrt(points / 100)) + 1`, computed in integers.
pub fn level_for_points(total_points: u64) -> u32 {
    let units = total_points / POINTS_PER_LEVEL_UNIT;
    let mut root = (units as f64).sqrt() as u64;
    while root * root > units {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= units {
        root += 1;
    }
    root as u32 + 1
}

pub fn level_info(total_points: u64) -> LevelInfo {
    let level = level_for_points(total_points);
    LevelInfo {
        level,
        xp: total_points - points_for_level(level),
        xp_to_next_level: points_for_level(level + 1).saturating_sub(total_points),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SkillTier {
    pub name: &'static str,
    pub required_points: u64,
    pub bonus: &'static str,
}

const fn tier(name: &'static str, required_points: u64, bonus: &'static str) -> SkillTier {
    SkillTier {
        name,
        required_points,
        bonus,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SkillTree {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub tiers: &'static [SkillTier],
}

pub const SKILL_TREES: &[SkillTree] = &[
    SkillTree {
        id: "statistics_fundamentals",
        name: "Statistics Fundamentals",
        icon: "📊",
        tiers: &[
            tier("Novice", 0, "Basic progress tracking"),
            tier("Apprentice", 500, "+10% XP for beginner concepts"),
            tier("Practitioner", 1500, "Unlock advanced hints"),
            tier("Expert", 3000, "+20% XP for all concepts"),
            tier("Master", 5000, "Unlock teaching mode"),
        ],
    },
    SkillTree {
        id: "learning_efficiency",
        name: "Learning Efficiency",
        icon: "⚡",
        tiers: &[
            tier("Beginner", 0, "Standard learning speed"),
            tier("Focused", 300, "Reduced distraction penalties"),
            tier("Optimized", 800, "AI-powered study recommendations"),
            tier("Accelerated", 2000, "Fast-track learning paths"),
            tier("Transcendent", 4000, "Instant mastery detection"),
        ],
    },
    SkillTree {
        id: "collaboration_master",
        name: "Collaboration Master",
        icon: "🤝",
        tiers: &[
            tier("Solo", 0, "Individual learning only"),
            tier("Helper", 200, "Can assist other learners"),
            tier("Mentor", 600, "Unlock group study sessions"),
            tier("Leader", 1200, "Create learning communities"),
            tier("Guru", 2500, "Global leaderboard access"),
        ],
    },
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTreeProgress {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub current_level: usize,
    pub current_level_name: &'static str,
    pub current_bonus: &'static str,
    pub next_level: Option<usize>,
    pub next_level_name: Option<&'static str>,
    pub next_level_points: Option<u64>,
    pub progress_to_next: f64,
}

impl SkillTree {
    /// Highest tier whose threshold is at or below `total_points`.
    pub fn current_tier(&self, total_points: u64) -> usize {
        self.tiers
            .iter()
            .rposition(|tier| tier.required_points <= total_points)
            .unwrap_or(0)
    }

    pub fn progress(&self, total_points: u64) -> SkillTreeProgress {
        let current = self.current_tier(total_points);
        let next = (current + 1 < self.tiers.len()).then_some(current + 1);
        let tier = &self.tiers[current];

        SkillTreeProgress {
            id: self.id,
            name: self.name,
            icon: self.icon,
            current_level: current,
            current_level_name: tier.name,
            current_bonus: tier.bonus,
            next_level: next,
            next_level_name: next.map(|i| self.tiers[i].name),
            next_level_points: next.map(|i| self.tiers[i].required_points),
            progress_to_next: self.progress_to_next(total_points, current),
        }
    }

    fn progress_to_next(&self, total_points: u64, current: usize) -> f64 {
        let Some(next) = self.tiers.get(current + 1) else {
            return 100.0;
        };
        let floor = self.tiers[current].required_points;
        if next.required_points <= floor {
            return 100.0;
        }
        let span = (next.required_points - floor) as f64;
        let gained = total_points as f64 - floor as f64;
        (gained / span * 100.0).clamp(0.0, 100.0)
    }
}

pub fn skill_tree_progress(total_points: u64) -> Vec<SkillTreeProgress> {
    SKILL_TREES
        .iter()
        .map(|tree| tree.progress(total_points))
        .collect()
}
