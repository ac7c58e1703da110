//! Attempt processing: the single update path for an item's knowledge state.

use chrono::{DateTime, Utc};

use super::forgetting::ForgettingCurve;
use super::{scheduler, sm2};
use crate::config::{self, ResponseTimeConfig, TrackerConfig};
use crate::domain::item::mean;
use crate::domain::{Attempt, ContextEntry, ItemState, ItemType};

/// Fold one attempt into an item's state.
///
/// A missing state starts from the defaults of a new item. Bookkeeping runs
/// first, then memory strength, ease factor and confidence are updated, and
/// finally the review scheduler recomputes interval, due date and level.
pub fn process_attempt(
  state: Option<ItemState>,
  item_type: ItemType,
  item_id: &str,
  attempt: &Attempt,
  now: DateTime<Utc>,
  config: &TrackerConfig,
) -> ItemState {
  let mut state = state.unwrap_or_else(|| ItemState::new(item_type, item_id, now));
  let curve = ForgettingCurve::from(config.forgetting);
  let latency_ms = attempt.usable_latency_ms();

  state.attempts = state.attempts.saturating_add(1);
  state.last_attempt_at = Some(now);

  if let Some(ms) = latency_ms {
    state.response_times_ms.push_back(ms);
    while state.response_times_ms.len() > config::RESPONSE_TIME_HISTORY {
      state.response_times_ms.pop_front();
    }
    state.avg_response_time_ms = mean(&state.response_times_ms);
  }

  if attempt.correct {
    state.correct = state.correct.saturating_add(1);
    state.streak = state.streak.saturating_add(1);
    state.repetitions = state.repetitions.saturating_add(1);
    curve.update_memory_strength(&mut state, true, now);
    state.ease_factor = sm2::update_ease_factor(state.ease_factor, config::QUALITY_CORRECT);
  } else {
    state.incorrect = state.incorrect.saturating_add(1);
    state.streak = 0;
    state.repetitions = 0;
    curve.update_memory_strength(&mut state, false, now);
    state.ease_factor = sm2::update_ease_factor(state.ease_factor, config::QUALITY_INCORRECT);
  }

  if let Some(ms) = latency_ms {
    state.confidence = calculate_confidence(&state, attempt.correct, ms, &config.response_time);
  }

  if !attempt.context.is_empty() {
    state.recent_contexts.push_back(ContextEntry {
      timestamp: now,
      correct: attempt.correct,
      latency_ms,
      error_type: attempt.context.error_type.clone(),
      tags: attempt.context.tags.clone(),
    });
    while state.recent_contexts.len() > config::CONTEXT_HISTORY {
      state.recent_contexts.pop_front();
    }
  }

  if item_type == ItemType::Grammar && !attempt.correct {
    if let Some(error_type) = attempt.context.error_type.as_deref().filter(|e| !e.is_empty()) {
      *state.error_tag_counts.entry(error_type.to_string()).or_insert(0) += 1;
    }
  }

  scheduler::reschedule(&mut state, attempt.correct, now, config);

  tracing::debug!(
    item = %state.item_id,
    item_type = item_type.as_str(),
    correct = attempt.correct,
    level = state.knowledge_level.as_str(),
    strength = state.memory_strength,
    "Processed attempt"
  );

  state
}

/// Smoothed learner confidence in [0, 1].
///
/// Starts from accuracy, nudged by answer speed (fast correct +0.1, slow
/// correct -0.1, incorrect -0.2), then blended 70/30 with the previous value.
pub fn calculate_confidence(
  state: &ItemState,
  correct: bool,
  latency_ms: f64,
  thresholds: &ResponseTimeConfig,
) -> f64 {
  let latency_secs = latency_ms / 1000.0;
  let mut estimate = state.accuracy();

  if correct {
    if latency_secs < thresholds.fast_secs {
      estimate = (estimate + 0.1).min(1.0);
    } else if latency_secs > thresholds.slow_secs {
      estimate = (estimate - 0.1).max(0.0);
    }
  } else {
    estimate = (estimate - 0.2).max(0.0);
  }

  let previous = if state.confidence.is_finite() {
    state.confidence
  } else {
    config::INITIAL_CONFIDENCE
  };
  (estimate * 0.7 + previous * 0.3).clamp(0.0, 1.0)
}
