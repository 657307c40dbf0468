use crate::store::{Concept, Difficulty, InMemoryGraphStore};

/// (id, name, difficulty)
const DEMO_CONCEPTS: &[(&str, &str, Difficulty)] = &[
    ("counting", "Counting & Combinatorics", Difficulty::Beginner),
    ("probability", "Basic Probability", Difficulty::Beginner),
    ("random_vars", "Random Variables", Difficulty::Intermediate),
    ("distributions", "Probability Distributions", Difficulty::Intermediate),
    ("bayes", "Bayes Theorem", Difficulty::Intermediate),
    ("sampling", "Sampling & CLT", Difficulty::Advanced),
    ("estimation", "Statistical Estimation", Difficulty::Advanced),
    ("hypothesis", "Hypothesis Testing", Difficulty::Advanced),
    ("regression", "Linear Regression", Difficulty::Advanced),
];

/// (prerequisite, concept)
const DEMO_EDGES: &[(&str, &str)] = &[
    ("counting", "probability"),
    ("probability", "random_vars"),
    ("random_vars", "distributions"),
    ("probability", "bayes"),
    ("distributions", "sampling"),
    ("sampling", "estimation"),
    ("estimation", "hypothesis"),
    ("random_vars", "regression"),
];

/// Loads the probability and statistics demo course. Safe to call twice.
pub fn seed_demo_course(store: &InMemoryGraphStore) {
    for &(id, name, difficulty) in DEMO_CONCEPTS {
        store.upsert_concept(Concept::new(id, name, difficulty));
    }
    for (prerequisite, concept) in DEMO_EDGES {
        store.add_prerequisite(prerequisite, concept);
    }
    tracing::info!(
        concepts = DEMO_CONCEPTS.len(),
        edges = DEMO_EDGES.len(),
        "seeded demo course"
    );
}
