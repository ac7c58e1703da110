//! Ebbinghaus forgetting-curve model.
//!
//! Retention after `t` days for memory strength `S` is
//! `R(t) = e^(-t / (S * decay_rate))`. Strength is a 0-10 proxy for how
//! durably an item is retained.

use chrono::{DateTime, Utc};

use crate::config::{self, ForgettingCurveConfig};
use crate::domain::ItemState;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Stateless forgetting-curve calculator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForgettingCurve {
  pub initial_strength: f64,
  pub decay_rate: f64,
  pub retrieval_threshold: f64,
}

impl Default for ForgettingCurve {
  fn default() -> Self {
    Self::from(ForgettingCurveConfig::default())
  }
}

impl From<ForgettingCurveConfig> for ForgettingCurve {
  fn from(config: ForgettingCurveConfig) -> Self {
    Self {
      initial_strength: config.initial_strength,
      decay_rate: config.decay_rate,
      retrieval_threshold: config.retrieval_threshold,
    }
  }
}

impl ForgettingCurve {
  /// Predicted probability of recall after `days_since_review` days.
  ///
  /// An empty memory (strength 0) has nothing to retain and yields 0.
  pub fn retention(&self, strength: f64, days_since_review: f64) -> f64 {
    let scale = strength * self.decay_rate;
    if strength <= 0.0 || scale <= 0.0 {
      return 0.0;
    }
    (-days_since_review.max(0.0) / scale).exp()
  }

  /// Strength lost after `days_since_review` days
  pub fn forgotten_amount(&self, strength: f64, days_since_review: f64) -> f64 {
    if strength <= 0.0 {
      return 0.0;
    }
    strength * (1.0 - self.retention(strength, days_since_review))
  }

  /// Days until predicted retention falls to the retrieval threshold.
  /// Returns 0 (review immediately) for an empty memory.
  pub fn optimal_review_interval_days(&self, strength: f64) -> f64 {
    if strength <= 0.0 || self.retrieval_threshold <= 0.0 || self.retrieval_threshold >= 1.0 {
      return 0.0;
    }
    (-strength * self.decay_rate * self.retrieval_threshold.ln()).max(0.0)
  }

  /// Apply decay since the last review, then reinforce or weaken the memory.
  ///
  /// Success adds `initial_strength * (1 - S/10)`, so gains shrink as the
  /// ceiling approaches. Failure halves the strength.
  pub fn update_memory_strength(&self, state: &mut ItemState, correct: bool, now: DateTime<Utc>) {
    let mut strength = state.memory_strength.clamp(0.0, config::MAX_MEMORY_STRENGTH);

    if let Some(last_review) = state.last_review_at {
      let days = days_between(last_review, now);
      strength -= self.forgotten_amount(strength, days);
    }

    strength = if correct {
      let boost = self.initial_strength * (1.0 - strength / config::MAX_MEMORY_STRENGTH);
      (strength + boost).min(config::MAX_MEMORY_STRENGTH)
    } else {
      (strength * config::FAILURE_STRENGTH_FACTOR).max(0.0)
    };

    state.memory_strength = strength.clamp(0.0, config::MAX_MEMORY_STRENGTH);
    state.last_review_at = Some(now);
  }
}

/// Fractional days from `earlier` to `later`, never negative
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
  ((later - earlier).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0)
}
