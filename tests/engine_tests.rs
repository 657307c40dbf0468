use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use graphlearn_engine::config::EngineSettings;
use graphlearn_engine::services::engine::CompletionInput;
use graphlearn_engine::services::profile::{DifficultyPreference, LearningStyle, Pace};
use graphlearn_engine::services::random::{FixedRandom, SeededRandom};
use graphlearn_engine::services::{EngineError, LearningEngine};
use graphlearn_engine::store::{CompletionRecord, Difficulty, GraphStore, InteractionRecord};

mod common;

fn run(attempts: u32, correct: u32, total: u32) -> CompletionInput {
    CompletionInput {
        attempts,
        time_spent_secs: 240,
        correct_answers: correct,
        total_questions: total,
    }
}

fn ids<T, F: Fn(&T) -> &str>(items: &[T], f: F) -> Vec<String> {
    items.iter().map(|i| f(i).to_string()).collect()
}

#[tokio::test]
async fn test_new_learner_starts_at_the_root() {
    let engine = common::engine_for(common::demo_store());

    let recs = engine.get_recommendations("newbie").await.unwrap();
    assert_eq!(ids(&recs, |r| r.id.as_str()), vec!["counting"]);

    let progress = engine.get_progress("newbie").await.unwrap();
    assert_eq!(progress.completed, 0);
    assert_eq!(progress.total, 9);
    assert_eq!(progress.percentage, 0.0);
}

#[tokio::test]
async fn test_walking_the_course_opens_branches() {
    let engine = common::engine_for(common::demo_store());

    let first = engine.complete_concept("l1", "counting", run(1, 3, 3)).await.unwrap();
    assert_eq!(first.newly_available, vec!["probability"]);

    let second = engine.complete_concept("l1", "probability", run(2, 2, 3)).await.unwrap();
    assert_eq!(second.newly_available, vec!["bayes", "random_vars"]);

    let mut recs = ids(&engine.get_recommendations("l1").await.unwrap(), |r| r.id.as_str());
    recs.sort();
    assert_eq!(recs, vec!["bayes", "random_vars"]);
}

#[tokio::test]
async fn test_completions_are_per_learner() {
    let engine = common::engine_for(common::demo_store());
    engine.complete_concept("alice", "counting", run(1, 1, 1)).await.unwrap();

    let bob = engine.get_learning_path("bob").await.unwrap();
    assert!(bob.iter().all(|entry| !entry.completed));

    let alice = engine.get_learning_path("alice").await.unwrap();
    let counting = alice.iter().find(|e| e.id == "counting").unwrap();
    assert!(counting.completed);
    assert_eq!(alice.last().unwrap().id, "counting");
}

#[tokio::test]
async fn test_three_completions_in_a_day_cascade_rewards() {
    let engine = common::engine_for(common::demo_store());

    let a = engine.complete_concept("l1", "counting", run(1, 1, 1)).await.unwrap();
    assert_eq!(ids(&a.new_achievements, |x| x.id.as_str()), vec!["first_steps"]);

    let b = engine.complete_concept("l1", "probability", run(1, 1, 1)).await.unwrap();
    assert_eq!(ids(&b.new_achievements, |x| x.id.as_str()), vec!["master_learner"]);

    let c = engine.complete_concept("l1", "random_vars", run(1, 1, 1)).await.unwrap();
    assert_eq!(ids(&c.new_achievements, |x| x.id.as_str()), vec!["speed_demon"]);

    let stats = engine.get_learner_stats("l1").await.unwrap();
    assert_eq!(stats.total_points, 1350);
    assert_eq!(stats.level, 4);
    assert_eq!(stats.stats.concepts_today, 3);
}

#[tokio::test]
async fn test_week_long_streak_earns_streak_master() {
    let store = common::demo_store();
    let engine = common::engine_for(Arc::clone(&store));
    let now = Utc::now();
    let concepts = [
        "counting",
        "probability",
        "random_vars",
        "distributions",
        "bayes",
        "sampling",
        "estimation",
    ];
    for (offset, concept) in concepts.iter().enumerate() {
        let record = CompletionRecord {
            concept_id: concept.to_string(),
            attempts: 1,
            time_spent_secs: 120,
            correct_answers: 1,
            total_questions: 2,
        };
        store
            .record_completion_at("l1", record, now - ChronoDuration::days(offset as i64))
            .unwrap();
    }

    let unlocked = ids(&engine.check_achievements("l1").await.unwrap(), |x| x.id.as_str());
    assert!(unlocked.contains(&"streak_master".to_string()));
    assert!(unlocked.contains(&"first_steps".to_string()));
    assert!(engine.check_achievements("l1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ai_interactions_unlock_ai_whisperer() {
    let engine = common::engine_for(common::demo_store());
    for _ in 0..10 {
        engine.record_ai_interaction("l1").await.unwrap();
    }
    let unlocked = engine.check_achievements("l1").await.unwrap();
    assert_eq!(ids(&unlocked, |x| x.id.as_str()), vec!["ai_whisperer"]);

    let catalogue = engine.get_achievement_catalogue("l1").await.unwrap();
    let whisperer = catalogue
        .iter()
        .find(|s| s.achievement.id == "ai_whisperer")
        .unwrap();
    assert!(whisperer.earned);
}

#[tokio::test]
async fn test_profile_from_quick_beginner_history() {
    let store = common::demo_store();
    let engine = common::engine_for(Arc::clone(&store));
    let yesterday = (Utc::now() - ChronoDuration::hours(30)).to_rfc3339();
    for concept in ["counting", "probability"] {
        store.push_history(InteractionRecord {
            learner_id: "quick".to_string(),
            concept_id: concept.to_string(),
            difficulty: Difficulty::Beginner,
            attempts: 1,
            time_spent_secs: 60,
            correctness: 1.0,
            timestamp: Some(yesterday.clone()),
        });
    }

    let profile = engine.get_profile("quick").await.unwrap();
    assert_eq!(profile.learning_style, LearningStyle::Visual);
    assert_eq!(profile.optimal_pace, Pace::Fast);
    assert_eq!(profile.difficulty_preference, DifficultyPreference::Gentle);
    assert_eq!(profile.recommended_session_length, 45);
    assert_eq!(profile.total_concepts_completed, 2);
    assert!(profile.retention_score < 1.0 && profile.retention_score > 0.8);
}

#[tokio::test]
async fn test_stalled_store_times_out() {
    let settings = EngineSettings {
        store_timeout: Duration::from_millis(20),
        ..EngineSettings::default()
    };
    let engine = LearningEngine::new(
        Arc::new(common::StalledStore),
        Arc::new(SeededRandom::new(1)),
        settings,
    );

    let profile = engine.get_profile("l1").await.unwrap();
    assert_eq!(profile.learning_style, LearningStyle::Visual);
    assert_eq!(profile.recommended_session_length, 30);

    assert!(engine.get_recommendations("l1").await.unwrap().is_empty());
    assert_eq!(engine.get_mastery_score("l1", "counting").await.unwrap(), 0.0);

    assert!(matches!(
        engine.award_points("l1", 10, "quiz").await,
        Err(EngineError::StoreUnavailable(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_awards_are_serialized() {
    let store = common::demo_store();
    let engine = Arc::new(common::engine_for(Arc::clone(&store)));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.award_points("busy", 10, "drill").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.point_log("busy").len(), 20);
    let stats = engine.get_learner_stats("busy").await.unwrap();
    assert_eq!(stats.total_points, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_submission_grants_once() {
    let store = common::demo_store();
    let engine = Arc::new(common::engine_for(Arc::clone(&store)));

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.complete_concept("dup", "counting", run(1, 1, 1)).await })
    };
    let second = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.complete_concept("dup", "counting", run(1, 1, 1)).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(store.earned_achievements("dup").len(), 1);
    let stats = engine.get_learner_stats("dup").await.unwrap();
    assert_eq!(stats.total_points, 100);
    assert_eq!(stats.stats.concepts_completed, 1);
}

#[tokio::test]
async fn test_seeded_rankings_are_reproducible() {
    let store = common::demo_store();
    for concept in ["counting", "probability", "random_vars"] {
        store
            .record_completion_at(
                "l1",
                CompletionRecord {
                    concept_id: concept.to_string(),
                    attempts: 1,
                    time_spent_secs: 100,
                    correct_answers: 1,
                    total_questions: 1,
                },
                Utc::now(),
            )
            .unwrap();
    }

    let make = || {
        LearningEngine::new(
            Arc::clone(&store) as Arc<dyn GraphStore>,
            Arc::new(SeededRandom::new(42)),
            EngineSettings::default(),
        )
    };
    let first = ids(&make().get_recommendations("l1").await.unwrap(), |r| r.id.as_str());
    let second = ids(&make().get_recommendations("l1").await.unwrap(), |r| r.id.as_str());
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[tokio::test]
async fn test_mastery_reflects_recorded_work() {
    let engine = common::engine_for(common::demo_store());
    assert_eq!(engine.get_mastery_score("l1", "counting").await.unwrap(), 0.0);

    engine
        .complete_concept(
            "l1",
            "counting",
            CompletionInput {
                attempts: 1,
                time_spent_secs: 300,
                correct_answers: 5,
                total_questions: 5,
            },
        )
        .await
        .unwrap();
    assert_eq!(engine.get_mastery_score("l1", "counting").await.unwrap(), 100.0);
}

#[tokio::test]
async fn test_personalized_content_and_session() {
    let engine = common::engine_for(common::demo_store());

    let content = engine.get_personalized_content("l1", "bayes").await.unwrap();
    assert!(content.explanation.contains("Bayes Theorem"));
    assert_eq!(content.learning_style, LearningStyle::Visual);

    let session = engine.get_study_session("l1").await.unwrap().unwrap();
    assert_eq!(session.concept.id, "counting");
    assert_eq!(session.session_length, 30);
    assert_eq!(session.study_tips.len(), 4);

    assert!(matches!(
        engine.get_personalized_content("l1", "alchemy").await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_grant_keeps_completion_and_retries_cleanly() {
    let memory = common::demo_store();
    let store = Arc::new(common::GrantFailingStore::new(Arc::clone(&memory)));
    let engine = LearningEngine::new(
        Arc::clone(&store) as Arc<dyn GraphStore>,
        Arc::new(FixedRandom::neutral()),
        EngineSettings::default(),
    );

    let outcome = engine.complete_concept("l1", "counting", run(1, 1, 1)).await.unwrap();
    assert!(outcome.achievements_pending);
    assert!(outcome.new_achievements.is_empty());
    assert_eq!(outcome.progress.completed, 1);
    assert!(memory.earned_achievements("l1").is_empty());
    assert!(memory.point_log("l1").is_empty());

    assert!(matches!(
        engine.check_achievements("l1").await,
        Err(EngineError::StoreUnavailable(_))
    ));

    store.set_fail_grants(false);
    let unlocked = engine.check_achievements("l1").await.unwrap();
    assert_eq!(ids(&unlocked, |x| x.id.as_str()), vec!["first_steps"]);
    let stats = engine.get_learner_stats("l1").await.unwrap();
    assert_eq!(stats.total_points, 100);
    assert_eq!(memory.point_log("l1").len(), 1);
}

#[tokio::test]
async fn test_failed_grant_after_award_reports_pending() {
    let memory = common::demo_store();
    let store = Arc::new(common::GrantFailingStore::new(Arc::clone(&memory)));
    let engine = LearningEngine::new(
        Arc::clone(&store) as Arc<dyn GraphStore>,
        Arc::new(FixedRandom::neutral()),
        EngineSettings::default(),
    );
    for _ in 0..10 {
        engine.record_ai_interaction("l1").await.unwrap();
    }

    let outcome = engine.award_points("l1", 40, "quiz").await.unwrap();
    assert!(outcome.achievements_pending);
    assert_eq!(outcome.new_total, 40);
    assert_eq!(memory.point_log("l1").len(), 1);

    store.set_fail_grants(false);
    let retry = engine.award_points("l1", 10, "quiz").await.unwrap();
    assert!(!retry.achievements_pending);
    assert_eq!(ids(&retry.new_achievements, |x| x.id.as_str()), vec!["ai_whisperer"]);
    assert_eq!(retry.new_total, 250);
}

#[tokio::test]
async fn test_cyclic_course_fails_without_hanging() {
    let store = common::cyclic_store();
    let engine = common::engine_for(Arc::clone(&store));

    let bounded = tokio::time::timeout(Duration::from_secs(1), engine.get_recommendations("l1"));
    let recommendations = bounded.await.expect("cycle check must terminate");
    assert!(matches!(
        recommendations,
        Err(EngineError::CycleDetected { node_count: 2, .. })
    ));

    assert!(matches!(
        engine.complete_concept("l1", "a", run(1, 1, 1)).await,
        Err(EngineError::CycleDetected { .. })
    ));
    assert!(matches!(
        engine.get_learning_path("l1").await,
        Err(EngineError::CycleDetected { .. })
    ));
    assert_eq!(engine.get_mastery_score("l1", "a").await.unwrap(), 0.0);
}
