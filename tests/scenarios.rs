//! End-to-end learning scenarios through the public API.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use es_notebook::config::SessionConfig;
use es_notebook::domain::{Attempt, Candidate, ItemState, ItemType, KnowledgeLevel, PriorityReason};
use es_notebook::srs::{ForgettingCurve, rank, select_session};
use es_notebook::KnowledgeStore;

fn settled(id: &str, now: DateTime<Utc>) -> ItemState {
    let mut state = ItemState::new(ItemType::Vocabulary, id, now - Duration::days(5));
    state.attempts = 6;
    state.correct = 5;
    state.incorrect = 1;
    state.streak = 3;
    state.confidence = 0.7;
    state.memory_strength = 5.0;
    state.knowledge_level = KnowledgeLevel::Learning;
    state.frequency_multiplier = 1.0;
    state.last_attempt_at = Some(now - Duration::hours(30));
    state.next_review_at = now + Duration::days(2);
    state
}

#[test]
fn test_level_leaves_new_on_third_attempt() {
    let mut store = KnowledgeStore::default();
    let start = Utc::now();

    for n in 1..=3 {
        let at = start + Duration::minutes(n);
        let state = store.record_attempt(ItemType::Vocabulary, "perro", &Attempt::correct(Some(1000.0)), at);
        if n < 3 {
            assert_eq!(state.knowledge_level, KnowledgeLevel::New, "after attempt {}", n);
        } else {
            assert_ne!(state.knowledge_level, KnowledgeLevel::New);
        }
    }

    let state = store.get(ItemType::Vocabulary, "perro").unwrap();
    assert_eq!(state.streak, 3);
    assert_eq!(state.repetitions, 3);
    assert!(state.next_review_at > start);
}

#[test]
fn test_optimal_interval_for_medium_strength() {
    let curve = ForgettingCurve::default();
    let expected = 5.0 * 0.5 * -(0.9f64.ln());
    let interval = curve.optimal_review_interval_days(5.0);
    assert!((interval - expected).abs() < 1e-9);
    assert!((interval - 0.263).abs() < 1e-3);
}

#[test]
fn test_ranking_mixed_pool() {
    let now = Utc::now();
    let pool = vec!["a", "b", "c", "d", "e"];

    let mut states = HashMap::new();
    let mut overdue = settled("a", now);
    overdue.next_review_at = now - Duration::hours(2);
    states.insert("a".to_string(), overdue);
    let mut shaky = settled("b", now);
    shaky.confidence = 0.2;
    states.insert("b".to_string(), shaky);
    states.insert("d".to_string(), settled("d", now));
    states.insert("e".to_string(), settled("e", now));

    let mut ranked = rank(&pool, &states, now);
    ranked.sort_by(|x, y| y.score.total_cmp(&x.score));

    let a = ranked.iter().find(|c| *c.item == "a").unwrap();
    assert_eq!(a.reason, PriorityReason::Overdue);
    let c = ranked.iter().find(|c| *c.item == "c").unwrap();
    assert_eq!(c.score, 50.0);
    assert_eq!(c.reason, PriorityReason::New);

    let order: Vec<&str> = ranked.iter().take(3).map(|c| *c.item).collect();
    assert_eq!(order, vec!["a", "c", "b"]);
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_two_categories_fill_the_session() {
    let now = Utc::now();
    let candidates: Vec<Candidate> = (0..14)
        .map(|i| {
            let category = if i % 3 == 0 { "verbs" } else { "nouns" };
            Candidate::new(format!("item-{}", i)).with_category(category)
        })
        .collect();

    let ranked = rank(&candidates, &HashMap::new(), now);
    let session = select_session(&ranked, 10, &SessionConfig::default());

    assert_eq!(session.len(), 10);
    let unique: HashSet<&str> = session.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(unique.len(), 10);
}

#[test]
fn test_short_pool_returns_everything_once() {
    let now = Utc::now();
    let candidates = vec![
        Candidate::new("uno").with_category("numbers"),
        Candidate::new("rojo").with_category("colors"),
        Candidate::new("dos").with_category("numbers"),
    ];

    let ranked = rank(&candidates, &HashMap::new(), now);
    let session = select_session(&ranked, 10, &SessionConfig::default());

    assert_eq!(session.len(), 3);
    let unique: HashSet<&str> = session.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(unique.len(), 3);
}

#[test]
fn test_single_category_session_is_homogeneous() {
    let candidates: Vec<Candidate> = (0..8)
        .map(|i| Candidate::new(format!("comida-{}", i)).with_category("food"))
        .collect();
    let store = KnowledgeStore::default();

    let session = store.plan_session(ItemType::Vocabulary, &candidates, 5, Utc::now());

    assert_eq!(session.len(), 5);
    assert!(session.iter().all(|c| c.category.as_deref() == Some("food")));
}

#[test]
fn test_failed_item_comes_back_first() {
    let mut store = KnowledgeStore::default();
    let earlier = Utc::now() - Duration::hours(1);
    for _ in 0..3 {
        store.record_attempt(ItemType::Grammar, "subjuntivo", &Attempt::correct(Some(2000.0)), earlier);
    }
    store.record_attempt(
        ItemType::Grammar,
        "subjuntivo",
        &Attempt::incorrect(Some(9000.0)).with_error_type("mood"),
        earlier,
    );
    store.record_attempt(ItemType::Grammar, "ser-estar", &Attempt::correct(Some(1500.0)), earlier);

    let state = store.get(ItemType::Grammar, "subjuntivo").unwrap();
    assert_eq!(state.interval_days, 0.0);
    assert_eq!(state.next_review_at, earlier + Duration::minutes(15));
    assert_eq!(state.error_tag_counts.get("mood"), Some(&1));

    let candidates = vec![
        Candidate::new("ser-estar").with_category("verbs"),
        Candidate::new("subjuntivo").with_category("moods"),
    ];
    let plan = store.plan_session(ItemType::Grammar, &candidates, 2, Utc::now());
    assert_eq!(plan[0].id, "subjuntivo");
}
