//! Persisted form of the knowledge store.
//!
//! The whole store serializes to one JSON object with a `vocabulary`,
//! `grammar` and `sentence` bucket, each mapping item id to `ItemState`.
//! Against a [`StateStorage`] each bucket is written under its own key.
//! Reading is tolerant: a malformed blob or bucket becomes an empty bucket
//! and a malformed item is skipped, all logged and counted in a
//! [`RestoreReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::{Buckets, KnowledgeStore, normalize_id};
use crate::config::{self, TrackerConfig};
use crate::db::LogOnError;
use crate::domain::{ContextEntry, ItemState, ItemType};
use crate::error::StorageError;
use crate::srs::scheduler;
use crate::storage::StateStorage;

/// Storage key for an item type's bucket
pub fn bucket_key(item_type: ItemType) -> &'static str {
  match item_type {
    ItemType::Vocabulary => "knowledge_tracker_vocabulary",
    ItemType::Grammar => "knowledge_tracker_grammar",
    ItemType::Sentence => "knowledge_tracker_sentences",
  }
}

/// Storage key the first-generation tracker wrote its buckets under.
///
/// An exported browser `localStorage` entry can be imported by saving its
/// value under the same key.
pub fn legacy_bucket_key(item_type: ItemType) -> &'static str {
  match item_type {
    ItemType::Vocabulary => "knowledgeTracker_vocabulary",
    ItemType::Grammar => "knowledgeTracker_grammar",
    ItemType::Sentence => "knowledgeTracker_sentences",
  }
}

/// Field name of an item type's bucket inside a whole-store blob
fn blob_field(item_type: ItemType) -> &'static str {
  item_type.as_str()
}

/// Outcome of reading persisted state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
  pub restored: usize,
  pub skipped: usize,
  /// Buckets that were present but unreadable and came back empty
  pub malformed_buckets: Vec<ItemType>,
}

impl RestoreReport {
  pub fn is_clean(&self) -> bool {
    self.skipped == 0 && self.malformed_buckets.is_empty()
  }
}

/// Read one bucket value, keeping every item that parses
fn parse_bucket(item_type: ItemType, value: &Value, report: &mut RestoreReport) -> HashMap<String, ItemState> {
  let mut bucket = HashMap::new();
  let Some(entries) = value.as_object() else {
    tracing::warn!(bucket = item_type.as_str(), "Bucket is not an object, starting empty");
    report.malformed_buckets.push(item_type);
    return bucket;
  };

  for (raw_id, raw_state) in entries {
    let id = normalize_id(raw_id).into_owned();
    if bucket.contains_key(&id) {
      tracing::warn!(bucket = item_type.as_str(), item = %raw_id, "Skipping item whose id duplicates another");
      report.skipped += 1;
      continue;
    }
    match serde_json::from_value::<ItemState>(raw_state.clone()) {
      Ok(mut state) => {
        state.item_id = id.clone();
        state.item_type = item_type;
        state.sanitize();
        bucket.insert(id, state);
        report.restored += 1;
      }
      Err(e) => {
        tracing::warn!(bucket = item_type.as_str(), item = %raw_id, "Skipping malformed item: {}", e);
        report.skipped += 1;
      }
    }
  }
  bucket
}

fn parse_bucket_blob(item_type: ItemType, blob: &str, report: &mut RestoreReport) -> HashMap<String, ItemState> {
  match serde_json::from_str::<Value>(blob) {
    Ok(value) => parse_bucket(item_type, &value, report),
    Err(e) => {
      tracing::warn!(bucket = item_type.as_str(), "Discarding unreadable bucket: {}", e);
      report.malformed_buckets.push(item_type);
      HashMap::new()
    }
  }
}

impl KnowledgeStore {
  /// Whole-store JSON blob
  pub fn serialize(&self) -> Result<String, StorageError> {
    Ok(serde_json::to_string(self.buckets())?)
  }

  /// Replace the store's contents with a blob from [`serialize`](Self::serialize).
  ///
  /// Never fails: anything unreadable is dropped and reported.
  pub fn restore(&mut self, blob: &str) -> RestoreReport {
    let mut report = RestoreReport::default();
    let mut buckets = Buckets::default();

    if let Some(root) = serde_json::from_str::<Value>(blob).log_warn("Discarding unreadable knowledge blob") {
      for item_type in ItemType::ALL {
        // Older blobs used the plural bucket name for sentences
        let value = root
          .get(blob_field(item_type))
          .or_else(|| (item_type == ItemType::Sentence).then(|| root.get("sentences")).flatten());
        if let Some(value) = value {
          *buckets.get_mut(item_type) = parse_bucket(item_type, value, &mut report);
        }
      }
    } else {
      report.malformed_buckets.extend(ItemType::ALL);
    }

    self.replace_buckets(buckets);
    tracing::info!(restored = report.restored, skipped = report.skipped, "Restored knowledge store");
    report
  }

  /// Write each bucket under its own key, in a single `save_all`
  pub fn save_to(&self, storage: &dyn StateStorage) -> Result<(), StorageError> {
    let entries = ItemType::ALL
      .into_iter()
      .map(|item_type| Ok((bucket_key(item_type), serde_json::to_string(self.bucket(item_type))?)))
      .collect::<Result<Vec<_>, StorageError>>()?;
    storage.save_all(&entries)?;
    tracing::info!(items = self.len(), "Saved knowledge store");
    Ok(())
  }

  /// Replace the store's contents with what `storage` holds.
  ///
  /// Storage failures leave the in-memory state untouched.
  pub fn load_from(&mut self, storage: &dyn StateStorage) -> Result<RestoreReport, StorageError> {
    let mut report = RestoreReport::default();
    let mut buckets = Buckets::default();

    for item_type in ItemType::ALL {
      if let Some(blob) = storage.load(bucket_key(item_type))? {
        *buckets.get_mut(item_type) = parse_bucket_blob(item_type, &blob, &mut report);
      }
    }

    self.replace_buckets(buckets);
    tracing::info!(restored = report.restored, skipped = report.skipped, "Loaded knowledge store");
    Ok(report)
  }

  /// Import first-generation tracker buckets.
  ///
  /// Items already tracked are left alone. Legacy keys are not removed.
  /// Returns how many items were imported.
  pub fn migrate_legacy(&mut self, storage: &dyn StateStorage, now: DateTime<Utc>) -> Result<usize, StorageError> {
    let mut imported = 0;
    let config = *self.config();

    for item_type in ItemType::ALL {
      let Some(blob) = storage.load(legacy_bucket_key(item_type))? else {
        continue;
      };
      let Some(entries) =
        serde_json::from_str::<BTreeMap<String, Value>>(&blob).log_warn("Skipping unreadable legacy bucket")
      else {
        continue;
      };

      let bucket = self.buckets_mut().get_mut(item_type);
      for (raw_id, raw_item) in entries {
        let id = normalize_id(&raw_id).into_owned();
        if bucket.contains_key(&id) {
          continue;
        }
        let Some(legacy) = serde_json::from_value::<LegacyItemState>(raw_item).log_warn("Skipping legacy item")
        else {
          continue;
        };
        bucket.insert(id.clone(), legacy.into_item_state(item_type, &id, now, &config));
        imported += 1;
      }
    }

    tracing::info!(imported, "Migrated legacy knowledge");
    Ok(imported)
  }
}

/// Item record of the first-generation tracker (epoch-millisecond timestamps)
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegacyItemState {
  attempts: u32,
  correct: u32,
  streak: u32,
  last_attempt: Option<i64>,
  first_attempt: Option<i64>,
  contexts: Vec<LegacyContext>,
  error_types: BTreeMap<String, u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegacyContext {
  timestamp: Option<i64>,
  correct: bool,
  error_type: Option<String>,
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
  ms.and_then(DateTime::from_timestamp_millis)
}

impl LegacyItemState {
  fn into_item_state(self, item_type: ItemType, id: &str, now: DateTime<Utc>, config: &TrackerConfig) -> ItemState {
    let first_attempt = from_millis(self.first_attempt).unwrap_or(now);
    let last_attempt = from_millis(self.last_attempt);

    let mut state = ItemState::new(item_type, id, first_attempt);
    state.attempts = self.attempts;
    state.correct = self.correct.min(self.attempts);
    state.incorrect = state.attempts - state.correct;
    state.streak = self.streak;
    // No review interval was ever recorded, so the SM-2 ladder starts over
    state.repetitions = 0;
    state.memory_strength = (self.streak as f64 * 0.5).min(config::MAX_MEMORY_STRENGTH);
    // An item never answered correctly starts from the neutral confidence
    let accuracy = state.accuracy();
    state.confidence = if accuracy > 0.0 { accuracy } else { config::INITIAL_CONFIDENCE };
    state.last_attempt_at = last_attempt;
    state.last_review_at = last_attempt;
    state.next_review_at = now;

    state.recent_contexts = self
      .contexts
      .into_iter()
      .map(|ctx| ContextEntry {
        timestamp: from_millis(ctx.timestamp).unwrap_or(first_attempt),
        correct: ctx.correct,
        latency_ms: None,
        error_type: ctx.error_type,
        tags: Vec::new(),
      })
      .collect();
    state.error_tag_counts = self.error_types;

    state.sanitize();
    scheduler::classify(&mut state, config.min_attempts);
    state
  }
}
