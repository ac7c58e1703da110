//! Aggregate progress figures over the knowledge store.

use serde::Serialize;
use std::collections::HashMap;

use super::KnowledgeStore;
use crate::domain::{ItemState, ItemType, KnowledgeLevel};

const LOW_ACCURACY: f64 = 0.60;
const LOW_CONFIDENCE: f64 = 0.40;
const SLOW_RESPONSE_SECS: f64 = 12.0;
const WEAK_MEMORY: f64 = 3.0;
const STRONG_ACCURACY: f64 = 0.85;
const STRONG_CONFIDENCE: f64 = 0.7;

/// Per-type level counts and averages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeStats {
  pub total: usize,
  pub new: usize,
  pub learning: usize,
  pub familiar: usize,
  pub mastered: usize,
  /// Struggling and critical together
  pub struggling: usize,
  pub average_accuracy: f64,
  pub average_confidence: f64,
  pub average_memory_strength: f64,
}

impl TypeStats {
  pub fn from_bucket(bucket: &HashMap<String, ItemState>) -> Self {
    let mut stats = TypeStats {
      total: bucket.len(),
      ..Default::default()
    };
    if bucket.is_empty() {
      return stats;
    }

    for state in bucket.values() {
      match state.knowledge_level {
        KnowledgeLevel::New => stats.new += 1,
        KnowledgeLevel::Learning => stats.learning += 1,
        KnowledgeLevel::Familiar => stats.familiar += 1,
        KnowledgeLevel::Mastered => stats.mastered += 1,
        KnowledgeLevel::Struggling | KnowledgeLevel::Critical => stats.struggling += 1,
      }
      stats.average_accuracy += state.accuracy();
      stats.average_confidence += state.confidence;
      stats.average_memory_strength += state.memory_strength;
    }

    let n = bucket.len() as f64;
    stats.average_accuracy /= n;
    stats.average_confidence /= n;
    stats.average_memory_strength /= n;
    stats
  }
}

/// What an insight is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
  LowAccuracy,
  LowConfidence,
  SlowResponses,
  WeakMemory,
  StrongProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
  Concern,
  Info,
  Success,
}

impl InsightKind {
  pub fn severity(&self) -> InsightSeverity {
    match self {
      Self::LowAccuracy | Self::LowConfidence | Self::WeakMemory => InsightSeverity::Concern,
      Self::SlowResponses => InsightSeverity::Info,
      Self::StrongProgress => InsightSeverity::Success,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Insight {
  pub kind: InsightKind,
  pub severity: InsightSeverity,
}

impl From<InsightKind> for Insight {
  fn from(kind: InsightKind) -> Self {
    Self {
      kind,
      severity: kind.severity(),
    }
  }
}

/// Store-wide metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningMetrics {
  pub accuracy: f64,
  pub confidence: f64,
  pub memory_strength: f64,
  /// Mean of per-item average response times, in seconds; 0 when none measured
  pub response_time_secs: f64,
  pub total_items: usize,
  pub mastered_items: usize,
  pub struggling_items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningInsights {
  pub metrics: LearningMetrics,
  pub insights: Vec<Insight>,
}

impl LearningInsights {
  /// Derive metrics and insight codes; an empty store yields neither
  pub fn from_states<'a>(states: impl IntoIterator<Item = &'a ItemState>) -> Self {
    let mut metrics = LearningMetrics::default();
    let mut timed = 0usize;

    for state in states {
      metrics.total_items += 1;
      metrics.accuracy += state.accuracy();
      metrics.confidence += state.confidence;
      metrics.memory_strength += state.memory_strength;
      if let Some(avg_ms) = state.avg_response_time_ms.filter(|ms| *ms > 0.0) {
        metrics.response_time_secs += avg_ms / 1000.0;
        timed += 1;
      }
      match state.knowledge_level {
        KnowledgeLevel::Mastered => metrics.mastered_items += 1,
        KnowledgeLevel::Struggling | KnowledgeLevel::Critical => metrics.struggling_items += 1,
        _ => {}
      }
    }

    if metrics.total_items == 0 {
      return Self::default();
    }

    let n = metrics.total_items as f64;
    metrics.accuracy /= n;
    metrics.confidence /= n;
    metrics.memory_strength /= n;
    if timed > 0 {
      metrics.response_time_secs /= timed as f64;
    }

    let mut insights = Vec::new();
    if metrics.accuracy < LOW_ACCURACY {
      insights.push(InsightKind::LowAccuracy.into());
    }
    if metrics.confidence < LOW_CONFIDENCE {
      insights.push(InsightKind::LowConfidence.into());
    }
    if metrics.response_time_secs > SLOW_RESPONSE_SECS {
      insights.push(InsightKind::SlowResponses.into());
    }
    if metrics.memory_strength < WEAK_MEMORY {
      insights.push(InsightKind::WeakMemory.into());
    }
    if metrics.accuracy > STRONG_ACCURACY && metrics.confidence > STRONG_CONFIDENCE {
      insights.push(InsightKind::StrongProgress.into());
    }

    Self { metrics, insights }
  }
}

/// Everything the progress view needs in one value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeSummary {
  pub vocabulary: TypeStats,
  pub grammar: TypeStats,
  pub sentence: TypeStats,
  pub insights: LearningInsights,
}

impl KnowledgeStore {
  pub fn type_stats(&self, item_type: ItemType) -> TypeStats {
    TypeStats::from_bucket(self.bucket(item_type))
  }

  pub fn learning_insights(&self) -> LearningInsights {
    LearningInsights::from_states(ItemType::ALL.iter().flat_map(|t| self.bucket(*t).values()))
  }

  pub fn summary(&self) -> KnowledgeSummary {
    KnowledgeSummary {
      vocabulary: self.type_stats(ItemType::Vocabulary),
      grammar: self.type_stats(ItemType::Grammar),
      sentence: self.type_stats(ItemType::Sentence),
      insights: self.learning_insights(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn state(id: &str, correct: u32, attempts: u32, confidence: f64, strength: f64) -> ItemState {
    let mut state = ItemState::new(ItemType::Vocabulary, id, Utc::now());
    state.attempts = attempts;
    state.correct = correct;
    state.incorrect = attempts - correct;
    state.confidence = confidence;
    state.memory_strength = strength;
    state
  }

  #[test]
  fn test_empty_bucket_stats_are_zero() {
    let stats = TypeStats::from_bucket(&HashMap::new());
    assert_eq!(stats, TypeStats::default());
  }

  #[test]
  fn test_type_stats_fold_critical_into_struggling() {
    let mut bucket = HashMap::new();
    let mut a = state("a", 1, 4, 0.2, 1.0);
    a.knowledge_level = KnowledgeLevel::Critical;
    let mut b = state("b", 1, 4, 0.4, 3.0);
    b.knowledge_level = KnowledgeLevel::Struggling;
    let mut c = state("c", 4, 4, 0.9, 8.0);
    c.knowledge_level = KnowledgeLevel::Mastered;
    bucket.insert("a".to_string(), a);
    bucket.insert("b".to_string(), b);
    bucket.insert("c".to_string(), c);

    let stats = TypeStats::from_bucket(&bucket);

    assert_eq!(stats.total, 3);
    assert_eq!(stats.struggling, 2);
    assert_eq!(stats.mastered, 1);
    assert!((stats.average_accuracy - 0.5).abs() < 1e-9);
    assert!((stats.average_memory_strength - 4.0).abs() < 1e-9);
  }

  #[test]
  fn test_no_items_no_insights() {
    let insights = LearningInsights::from_states(std::iter::empty());
    assert!(insights.insights.is_empty());
    assert_eq!(insights.metrics.total_items, 0);
  }

  #[test]
  fn test_concerns_raised_for_weak_learner() {
    let mut slow = state("lento", 1, 4, 0.2, 1.0);
    slow.avg_response_time_ms = Some(14_000.0);
    let states = [slow];

    let result = LearningInsights::from_states(&states);
    let kinds: Vec<InsightKind> = result.insights.iter().map(|i| i.kind).collect();

    assert_eq!(
      kinds,
      vec![
        InsightKind::LowAccuracy,
        InsightKind::LowConfidence,
        InsightKind::SlowResponses,
        InsightKind::WeakMemory,
      ]
    );
    assert!((result.metrics.response_time_secs - 14.0).abs() < 1e-9);
    assert_eq!(result.insights[2].severity, InsightSeverity::Info);
  }

  #[test]
  fn test_strong_progress() {
    let states = [state("a", 9, 10, 0.8, 6.0), state("b", 10, 10, 0.9, 7.0)];
    let result = LearningInsights::from_states(&states);
    assert_eq!(result.insights, vec![Insight::from(InsightKind::StrongProgress)]);
    assert_eq!(result.insights[0].severity, InsightSeverity::Success);
  }

  #[test]
  fn test_response_time_averages_only_timed_items() {
    let mut timed = state("a", 5, 5, 0.8, 5.0);
    timed.avg_response_time_ms = Some(4000.0);
    let untimed = state("b", 5, 5, 0.8, 5.0);
    let result = LearningInsights::from_states(&[timed, untimed]);
    assert!((result.metrics.response_time_secs - 4.0).abs() < 1e-9);
  }

  #[test]
  fn test_summary_covers_all_types() {
    let mut store = KnowledgeStore::default();
    let now = Utc::now();
    let attempt = crate::domain::Attempt::correct(Some(1500.0));
    store.record_attempt(ItemType::Vocabulary, "uno", &attempt, now);
    store.record_attempt(ItemType::Grammar, "ser", &attempt, now);

    let summary = store.summary();
    assert_eq!(summary.vocabulary.total, 1);
    assert_eq!(summary.grammar.total, 1);
    assert_eq!(summary.sentence.total, 0);
    assert_eq!(summary.insights.metrics.total_items, 2);
  }
}
