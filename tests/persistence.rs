//! SQLite-backed persistence across simulated restarts.

use chrono::{Duration, Utc};

use es_notebook::domain::{Attempt, ItemType};
use es_notebook::store::snapshot::{bucket_key, legacy_bucket_key};
use es_notebook::testing::TestEnv;
use es_notebook::{KnowledgeStore, StateStorage};

#[test]
fn test_progress_survives_restart() {
    let env = TestEnv::new().unwrap();
    let now = Utc::now();

    let mut store = KnowledgeStore::default();
    for i in 0..4 {
        store.record_attempt(
            ItemType::Vocabulary,
            "mariposa",
            &Attempt::correct(Some(1800.0)),
            now + Duration::minutes(i),
        );
    }
    store.record_attempt(
        ItemType::Grammar,
        "preterito",
        &Attempt::incorrect(Some(7000.0)).with_error_type("tense"),
        now,
    );
    store.save_to(&env.storage).unwrap();

    let storage = env.reopen().unwrap();
    let mut restarted = KnowledgeStore::default();
    let report = restarted.load_from(&storage).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.restored, 2);
    assert_eq!(restarted, store);
    assert!(storage.last_saved_at(bucket_key(ItemType::Vocabulary)).unwrap().is_some());
}

#[test]
fn test_corrupt_bucket_does_not_block_the_others() {
    let env = TestEnv::new().unwrap();
    let mut store = KnowledgeStore::default();
    store.record_attempt(ItemType::Sentence, "svo-1", &Attempt::correct(None), Utc::now());
    store.save_to(&env.storage).unwrap();

    env.storage.save(bucket_key(ItemType::Vocabulary), "{not json").unwrap();

    let mut restarted = KnowledgeStore::default();
    let report = restarted.load_from(&env.reopen().unwrap()).unwrap();

    assert_eq!(report.malformed_buckets, vec![ItemType::Vocabulary]);
    assert!(restarted.get(ItemType::Sentence, "svo-1").is_some());
    assert!(restarted.bucket(ItemType::Vocabulary).is_empty());
}

#[test]
fn test_legacy_items_are_imported_once() {
    let env = TestEnv::new().unwrap();
    let legacy = r#"{
        "hablar": {
            "attempts": 4,
            "correct": 3,
            "incorrect": 1,
            "streak": 2,
            "accuracy": 0.75,
            "lastAttempt": 1772359200000,
            "contexts": [{ "timestamp": 1772359200000, "correct": false }],
            "errorTypes": {}
        }
    }"#;
    env.storage.save(legacy_bucket_key(ItemType::Vocabulary), legacy).unwrap();

    let now = Utc::now();
    let mut store = KnowledgeStore::default();
    assert_eq!(store.migrate_legacy(&env.storage, now).unwrap(), 1);
    store.save_to(&env.storage).unwrap();

    let state = store.get(ItemType::Vocabulary, "hablar").unwrap();
    assert_eq!(state.attempts, 4);
    assert_eq!(state.repetitions, 0);
    assert!((state.memory_strength - 1.0).abs() < 1e-9);
    assert!((state.confidence - 0.75).abs() < 1e-9);
    assert_eq!(state.recent_contexts.len(), 1);

    let mut restarted = KnowledgeStore::default();
    restarted.load_from(&env.reopen().unwrap()).unwrap();
    assert_eq!(restarted.migrate_legacy(&env.storage, now).unwrap(), 0);
    assert_eq!(restarted.len(), 1);
}

#[test]
fn test_migrated_item_schedules_forward_after_restart() {
    let env = TestEnv::new().unwrap();
    env.storage
        .save(
            legacy_bucket_key(ItemType::Grammar),
            r#"{"ser-estar": {"attempts": 6, "correct": 6, "streak": 6}}"#,
        )
        .unwrap();
    let now = Utc::now();
    let mut store = KnowledgeStore::default();
    store.migrate_legacy(&env.storage, now).unwrap();
    store.save_to(&env.storage).unwrap();

    let mut restarted = KnowledgeStore::default();
    restarted.load_from(&env.reopen().unwrap()).unwrap();
    let mut at = now;
    for expected in [1.0, 3.0, 8.0] {
        at += Duration::days(2);
        let state = restarted.record_attempt(ItemType::Grammar, "ser-estar", &Attempt::correct(Some(2500.0)), at);
        assert_eq!(state.interval_days, expected);
        assert!(state.next_review_at > at);
    }
}

#[test]
fn test_reset_persists_empty_buckets() {
    let env = TestEnv::new().unwrap();
    let mut store = KnowledgeStore::default();
    store.record_attempt(ItemType::Vocabulary, "sol", &Attempt::correct(None), Utc::now());
    store.save_to(&env.storage).unwrap();

    store.reset();
    store.save_to(&env.storage).unwrap();

    let mut restarted = KnowledgeStore::default();
    let report = restarted.load_from(&env.reopen().unwrap()).unwrap();
    assert!(restarted.is_empty());
    assert!(report.is_clean());
}
