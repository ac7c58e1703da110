//! In-memory knowledge store: one bucket of item states per item type.
//!
//! The store is the only owner of `ItemState` records. Attempts flow in
//! through [`KnowledgeStore::record_attempt`]; ranking and session planning
//! only read. Persistence lives in [`snapshot`].

pub mod snapshot;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use unicode_normalization::{UnicodeNormalization, is_nfc};

use crate::config::TrackerConfig;
use crate::domain::{Attempt, CandidateItem, CandidateScore, ItemState, ItemType, KnowledgeLevel};
use crate::srs::{self, ranker, session_selector};

pub use snapshot::RestoreReport;
pub use stats::{
  Insight, InsightKind, InsightSeverity, KnowledgeSummary, LearningInsights, LearningMetrics, TypeStats,
};

/// Item states keyed by normalized id, one map per item type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buckets {
  pub vocabulary: HashMap<String, ItemState>,
  pub grammar: HashMap<String, ItemState>,
  pub sentence: HashMap<String, ItemState>,
}

impl Buckets {
  pub fn get(&self, item_type: ItemType) -> &HashMap<String, ItemState> {
    match item_type {
      ItemType::Vocabulary => &self.vocabulary,
      ItemType::Grammar => &self.grammar,
      ItemType::Sentence => &self.sentence,
    }
  }

  pub fn get_mut(&mut self, item_type: ItemType) -> &mut HashMap<String, ItemState> {
    match item_type {
      ItemType::Vocabulary => &mut self.vocabulary,
      ItemType::Grammar => &mut self.grammar,
      ItemType::Sentence => &mut self.sentence,
    }
  }

  fn total(&self) -> usize {
    self.vocabulary.len() + self.grammar.len() + self.sentence.len()
  }
}

/// Canonical form of an item id: surrounding whitespace trimmed, Unicode NFC
pub fn normalize_id(id: &str) -> Cow<'_, str> {
  let trimmed = id.trim();
  if is_nfc(trimmed) {
    Cow::Borrowed(trimmed)
  } else {
    Cow::Owned(trimmed.nfc().collect())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeStore {
  buckets: Buckets,
  config: TrackerConfig,
}

impl Default for KnowledgeStore {
  fn default() -> Self {
    Self::new(TrackerConfig::default())
  }
}

impl KnowledgeStore {
  pub fn new(config: TrackerConfig) -> Self {
    Self {
      buckets: Buckets::default(),
      config,
    }
  }

  pub fn config(&self) -> &TrackerConfig {
    &self.config
  }

  /// Fold an attempt into the item's state, creating it on first sight
  pub fn record_attempt(
    &mut self,
    item_type: ItemType,
    item_id: &str,
    attempt: &Attempt,
    now: DateTime<Utc>,
  ) -> &ItemState {
    let id = normalize_id(item_id).into_owned();
    if id.is_empty() {
      tracing::warn!(item_type = item_type.as_str(), "Recording attempt for an empty item id");
    }

    let bucket = self.buckets.get_mut(item_type);
    let previous = bucket.remove(&id);
    let updated = srs::process_attempt(previous, item_type, &id, attempt, now, &self.config);

    bucket.entry(id).insert_entry(updated).into_mut()
  }

  pub fn get(&self, item_type: ItemType, item_id: &str) -> Option<&ItemState> {
    self.buckets.get(item_type).get(normalize_id(item_id).as_ref())
  }

  pub fn bucket(&self, item_type: ItemType) -> &HashMap<String, ItemState> {
    self.buckets.get(item_type)
  }

  /// Tracked items across all buckets
  pub fn len(&self) -> usize {
    self.buckets.total()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drop every tracked item
  pub fn reset(&mut self) {
    let dropped = self.len();
    self.buckets = Buckets::default();
    tracing::info!(dropped, "Reset knowledge store");
  }

  /// Items classified struggling or critical, weakest first
  pub fn struggling_items(&self, item_type: ItemType) -> Vec<&ItemState> {
    let mut items: Vec<&ItemState> = self
      .bucket(item_type)
      .values()
      .filter(|state| state.knowledge_level.needs_focus())
      .collect();
    items.sort_by(|a, b| {
      let a_score = a.accuracy() * a.confidence;
      let b_score = b.accuracy() * b.confidence;
      a_score.total_cmp(&b_score).then_with(|| a.item_id.cmp(&b.item_id))
    });
    items
  }

  /// Mastered items, strongest memory first
  pub fn mastered_items(&self, item_type: ItemType) -> Vec<&ItemState> {
    let mut items: Vec<&ItemState> = self
      .bucket(item_type)
      .values()
      .filter(|state| state.knowledge_level == KnowledgeLevel::Mastered)
      .collect();
    items.sort_by(|a, b| {
      b.memory_strength
        .total_cmp(&a.memory_strength)
        .then_with(|| a.item_id.cmp(&b.item_id))
    });
    items
  }

  /// Score candidates against this store's states for `item_type`
  pub fn rank<'a, T: CandidateItem>(
    &self,
    item_type: ItemType,
    candidates: &'a [T],
    now: DateTime<Utc>,
  ) -> Vec<CandidateScore<'a, T>> {
    ranker::rank_with(candidates, |id| self.get(item_type, id), now)
  }

  /// Candidates never attempted or due now
  pub fn items_due_for_review<'a, T: CandidateItem>(
    &self,
    item_type: ItemType,
    candidates: &'a [T],
    now: DateTime<Utc>,
  ) -> Vec<&'a T> {
    session_selector::items_due_with(candidates, |id| self.get(item_type, id), now)
  }

  /// Rank the candidates and pick a diverse session of up to `count` items
  pub fn plan_session<'a, T: CandidateItem>(
    &self,
    item_type: ItemType,
    candidates: &'a [T],
    count: usize,
    now: DateTime<Utc>,
  ) -> Vec<&'a T> {
    let ranked = self.rank(item_type, candidates, now);
    session_selector::select_session(&ranked, count, &self.config.session)
  }

  pub(crate) fn buckets(&self) -> &Buckets {
    &self.buckets
  }

  pub(crate) fn replace_buckets(&mut self, buckets: Buckets) {
    self.buckets = buckets;
  }

  pub(crate) fn buckets_mut(&mut self) -> &mut Buckets {
    &mut self.buckets
  }
}
