use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::config;

/// Kind of learnable item. Each kind is kept in its own persisted bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
  Vocabulary,
  Grammar,
  Sentence,
}

impl ItemType {
  pub const ALL: [ItemType; 3] = [Self::Vocabulary, Self::Grammar, Self::Sentence];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "vocabulary" | "vocab" => Some(Self::Vocabulary),
      "grammar" => Some(Self::Grammar),
      "sentence" | "sentences" => Some(Self::Sentence),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Vocabulary => "vocabulary",
      Self::Grammar => "grammar",
      Self::Sentence => "sentence",
    }
  }
}

/// Discrete mastery classification of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeLevel {
  #[default]
  New,
  Learning,
  Familiar,
  Mastered,
  Struggling,
  Critical,
}

impl KnowledgeLevel {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "new" => Some(Self::New),
      "learning" => Some(Self::Learning),
      "familiar" => Some(Self::Familiar),
      "mastered" => Some(Self::Mastered),
      "struggling" => Some(Self::Struggling),
      "critical" => Some(Self::Critical),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Learning => "learning",
      Self::Familiar => "familiar",
      Self::Mastered => "mastered",
      Self::Struggling => "struggling",
      Self::Critical => "critical",
    }
  }

  /// Ordering by demonstrated mastery: new < learning/struggling/critical < familiar < mastered
  pub fn mastery_rank(&self) -> u8 {
    match self {
      Self::New => 0,
      Self::Learning | Self::Struggling | Self::Critical => 1,
      Self::Familiar => 2,
      Self::Mastered => 3,
    }
  }

  /// True for levels that call for focused practice
  pub fn needs_focus(&self) -> bool {
    matches!(self, Self::Struggling | Self::Critical)
  }
}

/// Optional metadata the UI attaches to an attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptContext {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_type: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

impl AttemptContext {
  pub fn is_empty(&self) -> bool {
    self.error_type.is_none() && self.tags.is_empty()
  }
}

/// A single learner answer, as reported by the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
  pub correct: bool,
  /// Response latency in milliseconds, if measured
  #[serde(default)]
  pub latency_ms: Option<f64>,
  #[serde(default)]
  pub context: AttemptContext,
}

impl Attempt {
  pub fn new(correct: bool, latency_ms: Option<f64>) -> Self {
    Self {
      correct,
      latency_ms,
      context: AttemptContext::default(),
    }
  }

  pub fn correct(latency_ms: Option<f64>) -> Self {
    Self::new(true, latency_ms)
  }

  pub fn incorrect(latency_ms: Option<f64>) -> Self {
    Self::new(false, latency_ms)
  }

  pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
    self.context.error_type = Some(error_type.into());
    self
  }

  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.context.tags.push(tag.into());
    self
  }

  /// Latency usable by the models; negative and non-finite values count as absent
  pub fn usable_latency_ms(&self) -> Option<f64> {
    self.latency_ms.filter(|ms| ms.is_finite() && *ms >= 0.0)
  }
}

/// Recorded metadata of one past attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
  pub timestamp: DateTime<Utc>,
  pub correct: bool,
  #[serde(default)]
  pub latency_ms: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_type: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

/// Per-item knowledge record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
  pub item_id: String,
  pub item_type: ItemType,

  // Counters
  pub attempts: u32,
  pub correct: u32,
  pub incorrect: u32,
  pub streak: u32,

  // SM-2 fields
  pub ease_factor: f64,
  pub interval_days: f64,
  pub repetitions: u32,
  pub next_review_at: DateTime<Utc>,

  // Forgetting curve
  pub memory_strength: f64,
  #[serde(default)]
  pub last_review_at: Option<DateTime<Utc>>,

  #[serde(default)]
  pub last_attempt_at: Option<DateTime<Utc>>,
  pub first_attempt_at: DateTime<Utc>,

  // Response time tracking
  #[serde(default)]
  pub response_times_ms: VecDeque<f64>,
  #[serde(default)]
  pub avg_response_time_ms: Option<f64>,
  pub confidence: f64,

  // Classification
  #[serde(default)]
  pub knowledge_level: KnowledgeLevel,
  pub frequency_multiplier: f64,

  #[serde(default)]
  pub recent_contexts: VecDeque<ContextEntry>,
  /// Error tag tally; only grammar items collect these
  #[serde(default)]
  pub error_tag_counts: BTreeMap<String, u32>,
}

impl ItemState {
  pub fn new(item_type: ItemType, item_id: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      item_id: item_id.into(),
      item_type,
      attempts: 0,
      correct: 0,
      incorrect: 0,
      streak: 0,
      ease_factor: config::MAX_EASE_FACTOR,
      interval_days: 0.0,
      repetitions: 0,
      next_review_at: now,
      memory_strength: 0.0,
      last_review_at: None,
      last_attempt_at: None,
      first_attempt_at: now,
      response_times_ms: VecDeque::new(),
      avg_response_time_ms: None,
      confidence: config::INITIAL_CONFIDENCE,
      knowledge_level: KnowledgeLevel::New,
      frequency_multiplier: 1.0,
      recent_contexts: VecDeque::new(),
      error_tag_counts: BTreeMap::new(),
    }
  }

  /// Share of correct attempts; 0 when the item was never attempted
  pub fn accuracy(&self) -> f64 {
    if self.attempts > 0 {
      self.correct as f64 / self.attempts as f64
    } else {
      0.0
    }
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.next_review_at <= now
  }

  /// Repair a state that came from outside the attempt processor.
  ///
  /// Non-finite numbers fall back to their initial values, bounded fields are
  /// clamped and histories are cut to their caps.
  pub fn sanitize(&mut self) {
    fn finite_or(value: f64, fallback: f64) -> f64 {
      if value.is_finite() { value } else { fallback }
    }

    self.ease_factor = finite_or(self.ease_factor, config::MAX_EASE_FACTOR)
      .clamp(config::MIN_EASE_FACTOR, config::MAX_EASE_FACTOR);
    self.memory_strength =
      finite_or(self.memory_strength, 0.0).clamp(0.0, config::MAX_MEMORY_STRENGTH);
    self.confidence = finite_or(self.confidence, config::INITIAL_CONFIDENCE).clamp(0.0, 1.0);
    self.interval_days = finite_or(self.interval_days, 0.0).max(0.0);
    let multiplier = finite_or(self.frequency_multiplier, 1.0);
    self.frequency_multiplier = if multiplier > 0.0 { multiplier } else { 1.0 };

    self.correct = self.correct.min(self.attempts);
    self.incorrect = self.attempts - self.correct;
    self.streak = self.streak.min(self.correct);
    if self.attempts == 0 {
      self.knowledge_level = KnowledgeLevel::New;
    }

    self.response_times_ms.retain(|ms| ms.is_finite() && *ms >= 0.0);
    while self.response_times_ms.len() > config::RESPONSE_TIME_HISTORY {
      self.response_times_ms.pop_front();
    }
    self.avg_response_time_ms = mean(&self.response_times_ms);
    while self.recent_contexts.len() > config::CONTEXT_HISTORY {
      self.recent_contexts.pop_front();
    }
  }
}

/// Arithmetic mean, `None` for an empty sequence
pub(crate) fn mean(values: &VecDeque<f64>) -> Option<f64> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().sum::<f64>() / values.len() as f64)
  }
}
