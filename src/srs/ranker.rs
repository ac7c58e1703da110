//! Multi-signal candidate prioritization.
//!
//! Each candidate gets an additive score from:
//! - How far past its due date it is
//! - Low confidence or accuracy
//! - Weak memory strength
//! - A recent unresolved error
//!
//! The sum is scaled by the item's frequency multiplier, and items left alone
//! for over a week get a flat spacing bonus on top.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::forgetting::days_between;
use crate::config;
use crate::domain::{CandidateItem, CandidateScore, ItemState, PriorityReason};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Priority score and reason for a single item.
///
/// `None` means the item was never attempted.
pub fn score_item(state: Option<&ItemState>, now: DateTime<Utc>) -> (f64, PriorityReason) {
  let Some(state) = state else {
    return (config::NEW_ITEM_SCORE, PriorityReason::New);
  };

  let mut score = 0.0;
  let mut reason = None;

  // Factor 1: Overdue (grows 5 points per hour, capped)
  if state.next_review_at <= now {
    let hours_overdue = hours_between(state.next_review_at, now);
    score += (config::OVERDUE_BASE_SCORE + hours_overdue * config::OVERDUE_SCORE_PER_HOUR)
      .min(config::OVERDUE_MAX_SCORE);
    reason.get_or_insert(PriorityReason::Overdue);
  }

  // Factor 2: Low confidence or accuracy
  let low_accuracy = state.attempts > 0 && state.accuracy() < config::STRUGGLE_ACCURACY;
  if state.confidence < config::STRUGGLING_RANK_CONFIDENCE || low_accuracy {
    score += config::STRUGGLING_SCORE;
    reason.get_or_insert(PriorityReason::Struggling);
  }

  // Factor 3: Weak memory
  if state.memory_strength < config::WEAK_MEMORY_RANK_STRENGTH {
    score += config::WEAK_MEMORY_SCORE;
    reason.get_or_insert(PriorityReason::WeakMemory);
  }

  // Factor 4: Failed within the last day and not answered correctly since
  if let Some(last_attempt) = state.last_attempt_at {
    let hours_since = hours_between(last_attempt, now);
    if hours_since < config::RECENT_ERROR_WINDOW_HOURS && state.streak == 0 {
      score += config::RECENT_ERROR_SCORE;
      reason.get_or_insert(PriorityReason::RecentError);
    }
  }

  score *= state.frequency_multiplier;

  // Spacing bonus for neglected items, added after the multiplier
  if let Some(last_attempt) = state.last_attempt_at {
    if days_between(last_attempt, now) > config::SPACING_BONUS_DAYS {
      score += config::SPACING_BONUS_SCORE;
    }
  }

  (score, reason.unwrap_or(PriorityReason::Practice))
}

/// Score every candidate against its recorded state, in input order
pub fn rank<'a, T: CandidateItem>(
  candidates: &'a [T],
  states: &HashMap<String, ItemState>,
  now: DateTime<Utc>,
) -> Vec<CandidateScore<'a, T>> {
  rank_with(candidates, |id| states.get(id), now)
}

/// Like [`rank`], resolving states through `lookup`
pub fn rank_with<'a, 's, T, F>(
  candidates: &'a [T],
  lookup: F,
  now: DateTime<Utc>,
) -> Vec<CandidateScore<'a, T>>
where
  T: CandidateItem,
  F: Fn(&str) -> Option<&'s ItemState>,
{
  let ranked: Vec<_> = candidates
    .iter()
    .map(|item| {
      let (score, reason) = score_item(lookup(item.item_id()), now);
      CandidateScore { item, score, reason }
    })
    .collect();

  tracing::debug!(candidates = ranked.len(), "Ranked candidates");
  ranked
}

/// Fractional hours from `earlier` to `later`, never negative
fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
  ((later - earlier).num_milliseconds() as f64 / MILLIS_PER_HOUR).max(0.0)
}
