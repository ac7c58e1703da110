use crate::config::{FIRST_INTERVAL_DAYS, MAX_EASE_FACTOR, MIN_EASE_FACTOR, SECOND_INTERVAL_DAYS};

/// Apply the SM-2 ease update for a recall of `quality` (0-5).
///
/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), clamped to [1.3, 2.5].
pub fn update_ease_factor(current_ease_factor: f64, quality: u8) -> f64 {
  let q = quality.min(5) as f64;
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  let current = if current_ease_factor.is_finite() {
    current_ease_factor
  } else {
    MAX_EASE_FACTOR
  };
  (current + ease_delta).clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

/// SM-2 spacing for a successful review, in days.
///
/// `repetitions` is the count after the current success: 1 day after the
/// first, 3 after the second, then the previous interval grown by the ease
/// factor and rounded to whole days.
pub fn next_interval_days(repetitions: u32, previous_interval_days: f64, ease_factor: f64) -> f64 {
  match repetitions {
    0 | 1 => FIRST_INTERVAL_DAYS,
    2 => SECOND_INTERVAL_DAYS,
    _ => (previous_interval_days.max(0.0) * ease_factor).round(),
  }
}
