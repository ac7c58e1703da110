//! Bounded practice-session selection with a category-diversity constraint.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

use crate::config::{self, SessionConfig};
use crate::domain::{CandidateItem, CandidateScore, ItemState};

/// Pick up to `target` items from a ranking pass.
///
/// Candidates are visited by score, highest first (equal scores keep their
/// input order). Early on every item is accepted; once `diversity_ratio` of
/// the quota is filled and `min_categories` categories have been seen, only
/// items from unseen categories get in. Any shortfall is backfilled with the
/// best remaining items regardless of category.
pub fn select_session<'a, T: CandidateItem>(
  ranked: &[CandidateScore<'a, T>],
  target: usize,
  config: &SessionConfig,
) -> Vec<&'a T> {
  if target == 0 || ranked.is_empty() {
    return Vec::new();
  }

  let mut order: Vec<usize> = (0..ranked.len()).collect();
  // sort_by is stable
  order.sort_by(|&a, &b| ranked[b].score.total_cmp(&ranked[a].score));

  let relax_after = target as f64 * config.diversity_ratio;
  let mut taken = vec![false; ranked.len()];
  let mut selected: Vec<&'a T> = Vec::with_capacity(target.min(ranked.len()));
  let mut seen_categories: HashSet<&'a str> = HashSet::new();

  for &idx in &order {
    if selected.len() >= target {
      break;
    }
    let item = ranked[idx].item;
    let category = item.category().unwrap_or(config::DEFAULT_CATEGORY);

    let accept = (selected.len() as f64) < relax_after
      || !seen_categories.contains(category)
      || seen_categories.len() < config.min_categories;

    if accept {
      selected.push(item);
      taken[idx] = true;
      seen_categories.insert(category);
    }
  }

  let diverse = selected.len();
  for &idx in &order {
    if selected.len() >= target {
      break;
    }
    if !taken[idx] {
      selected.push(ranked[idx].item);
      taken[idx] = true;
    }
  }

  tracing::debug!(
    requested = target,
    selected = selected.len(),
    backfilled = selected.len() - diverse,
    categories = seen_categories.len(),
    "Selected practice session"
  );

  selected
}

/// Candidates never attempted or whose review time has come
pub fn items_due_for_review<'a, T: CandidateItem>(
  candidates: &'a [T],
  states: &HashMap<String, ItemState>,
  now: DateTime<Utc>,
) -> Vec<&'a T> {
  items_due_with(candidates, |id| states.get(id), now)
}

/// Like [`items_due_for_review`], resolving states through `lookup`
pub fn items_due_with<'a, 's, T, F>(
  candidates: &'a [T],
  lookup: F,
  now: DateTime<Utc>,
) -> Vec<&'a T>
where
  T: CandidateItem,
  F: Fn(&str) -> Option<&'s ItemState>,
{
  candidates
    .iter()
    .filter(|item| lookup(item.item_id()).is_none_or(|state| state.is_due(now)))
    .collect()
}

/// Reorder a selected session for variety using the caller's random source
pub fn shuffle_for_variety<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
  items.shuffle(rng);
}
