//! Review scheduling and knowledge-level classification.
//!
//! Runs after every attempt on the freshly updated state. The next review is
//! the shorter of the SM-2 interval and the forgetting-curve optimum; the
//! knowledge level and frequency multiplier come from a weighted mix of
//! accuracy, confidence and memory strength.

use chrono::{DateTime, Duration, Utc};

use super::forgetting::ForgettingCurve;
use super::sm2;
use crate::config::{self, TrackerConfig};
use crate::domain::{ItemState, KnowledgeLevel};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Combined scores this close below a threshold still reach it
const SCORE_EPSILON: f64 = 1e-9;

/// Recompute interval, next review, level and multiplier after an attempt
pub fn reschedule(state: &mut ItemState, correct: bool, now: DateTime<Utc>, config: &TrackerConfig) {
  let curve = ForgettingCurve::from(config.forgetting);
  schedule_next_review(state, correct, now, &curve);
  classify(state, config.min_attempts);
}

/// Set `interval_days` and `next_review_at`.
///
/// A failure always retries in 15 minutes regardless of ease.
pub fn schedule_next_review(
  state: &mut ItemState,
  correct: bool,
  now: DateTime<Utc>,
  curve: &ForgettingCurve,
) {
  if !correct {
    state.interval_days = 0.0;
    state.next_review_at = now + Duration::minutes(config::FAILURE_RETRY_MINUTES);
    return;
  }

  state.interval_days = sm2::next_interval_days(state.repetitions, state.interval_days, state.ease_factor);
  let optimal = curve.optimal_review_interval_days(state.memory_strength);
  let final_interval = state.interval_days.min(optimal).max(0.0);

  state.next_review_at = add_days(now, final_interval);
}

fn add_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
  let millis = (days * MILLIS_PER_DAY).round();
  if !millis.is_finite() || millis >= i64::MAX as f64 {
    return DateTime::<Utc>::MAX_UTC;
  }
  now
    .checked_add_signed(Duration::milliseconds(millis as i64))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Weighted mastery score in [0, 1]
pub fn combined_score(state: &ItemState) -> f64 {
  let memory = (state.memory_strength / config::MAX_MEMORY_STRENGTH).clamp(0.0, 1.0);
  config::ACCURACY_WEIGHT * state.accuracy()
    + config::CONFIDENCE_WEIGHT * state.confidence
    + config::MEMORY_WEIGHT * memory
}

/// Pick the knowledge level and its base frequency multiplier.
///
/// Rules are tried in order and the first match wins.
pub fn knowledge_level_for(state: &ItemState, min_attempts: u32) -> (KnowledgeLevel, f64) {
  if state.attempts < min_attempts {
    return (KnowledgeLevel::New, 1.0);
  }

  let accuracy = state.accuracy();
  let confidence = state.confidence;
  let score = combined_score(state);

  if score + SCORE_EPSILON >= config::MASTERED_SCORE
    && state.streak >= config::MASTERED_STREAK
    && state.ease_factor >= config::MASTERED_EASE
  {
    (KnowledgeLevel::Mastered, 0.2)
  } else if score + SCORE_EPSILON >= config::FAMILIAR_SCORE && state.streak >= config::FAMILIAR_STREAK {
    (KnowledgeLevel::Familiar, 0.5)
  } else if accuracy < config::STRUGGLE_ACCURACY || confidence < config::STRUGGLE_CONFIDENCE {
    (KnowledgeLevel::Struggling, 2.5)
  } else if accuracy < config::CRITICAL_ACCURACY
    || (confidence < config::CRITICAL_CONFIDENCE && state.attempts >= config::CRITICAL_MIN_ATTEMPTS)
  {
    (KnowledgeLevel::Critical, 4.0)
  } else {
    (KnowledgeLevel::Learning, 1.2)
  }
}

/// Set `knowledge_level` and `frequency_multiplier`, including the
/// memory-strength adjustment.
pub fn classify(state: &mut ItemState, min_attempts: u32) {
  let (level, mut multiplier) = knowledge_level_for(state, min_attempts);

  if level != KnowledgeLevel::New {
    if state.memory_strength < config::WEAK_MEMORY_STRENGTH {
      multiplier *= config::WEAK_MEMORY_BOOST;
    } else if state.memory_strength > config::STRONG_MEMORY_STRENGTH {
      multiplier *= config::STRONG_MEMORY_DAMPING;
    }
  }

  state.knowledge_level = level;
  state.frequency_multiplier = multiplier;
}
