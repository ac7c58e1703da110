//! Tracker configuration constants.
//!
//! Named values for the scheduling and mastery models live here, together
//! with the runtime-tunable `TrackerConfig` loaded from `config.toml`.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== SM-2 Ease Factor ====================

/// Lowest ease factor an item can reach
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Highest ease factor; also the starting value for new items
pub const MAX_EASE_FACTOR: f64 = 2.5;

/// SM-2 quality used for a correct answer (perfect recall)
pub const QUALITY_CORRECT: u8 = 5;

/// SM-2 quality used for an incorrect answer (complete blackout)
pub const QUALITY_INCORRECT: u8 = 0;

// ==================== Memory Strength ====================

/// Memory strength ceiling
pub const MAX_MEMORY_STRENGTH: f64 = 10.0;

/// Factor applied to memory strength after a failed retrieval
pub const FAILURE_STRENGTH_FACTOR: f64 = 0.5;

// ==================== Scheduling ====================

/// Minutes until an item is due again after an incorrect answer
pub const FAILURE_RETRY_MINUTES: i64 = 15;

/// SM-2 interval after the first successful repetition (days)
pub const FIRST_INTERVAL_DAYS: f64 = 1.0;

/// SM-2 interval after the second successful repetition (days)
pub const SECOND_INTERVAL_DAYS: f64 = 3.0;

// ==================== History ====================

/// Maximum number of response times kept per item
pub const RESPONSE_TIME_HISTORY: usize = 10;

/// Maximum number of attempt contexts kept per item
pub const CONTEXT_HISTORY: usize = 10;

/// Confidence assigned to a brand new item
pub const INITIAL_CONFIDENCE: f64 = 0.5;

// ==================== Classification ====================

/// Weight of accuracy in the combined mastery score
pub const ACCURACY_WEIGHT: f64 = 0.5;
/// Weight of confidence in the combined mastery score
pub const CONFIDENCE_WEIGHT: f64 = 0.3;
/// Weight of normalised memory strength in the combined mastery score
pub const MEMORY_WEIGHT: f64 = 0.2;

pub const MASTERED_SCORE: f64 = 0.85;
pub const MASTERED_STREAK: u32 = 5;
pub const MASTERED_EASE: f64 = 2.3;
pub const FAMILIAR_SCORE: f64 = 0.70;
pub const FAMILIAR_STREAK: u32 = 3;
pub const STRUGGLE_ACCURACY: f64 = 0.50;
pub const STRUGGLE_CONFIDENCE: f64 = 0.3;
pub const CRITICAL_ACCURACY: f64 = 0.30;
pub const CRITICAL_CONFIDENCE: f64 = 0.2;
pub const CRITICAL_MIN_ATTEMPTS: u32 = 5;

/// Memory strength below which practice frequency is raised
pub const WEAK_MEMORY_STRENGTH: f64 = 2.0;
/// Memory strength above which practice frequency is lowered
pub const STRONG_MEMORY_STRENGTH: f64 = 7.0;
pub const WEAK_MEMORY_BOOST: f64 = 1.3;
pub const STRONG_MEMORY_DAMPING: f64 = 0.8;

// ==================== Ranking ====================

/// Score given to candidates that were never attempted
pub const NEW_ITEM_SCORE: f64 = 50.0;
pub const OVERDUE_BASE_SCORE: f64 = 50.0;
pub const OVERDUE_SCORE_PER_HOUR: f64 = 5.0;
pub const OVERDUE_MAX_SCORE: f64 = 100.0;
pub const STRUGGLING_SCORE: f64 = 40.0;
pub const STRUGGLING_RANK_CONFIDENCE: f64 = 0.4;
pub const WEAK_MEMORY_SCORE: f64 = 30.0;
pub const WEAK_MEMORY_RANK_STRENGTH: f64 = 3.0;
pub const RECENT_ERROR_SCORE: f64 = 35.0;
pub const RECENT_ERROR_WINDOW_HOURS: f64 = 24.0;
pub const SPACING_BONUS_SCORE: f64 = 20.0;
pub const SPACING_BONUS_DAYS: f64 = 7.0;

/// Category assumed for candidates that carry none
pub const DEFAULT_CATEGORY: &str = "general";

// ==================== Runtime Configuration ====================

/// Ebbinghaus forgetting-curve parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForgettingCurveConfig {
    /// Strength gained by a successful retrieval of an empty memory
    pub initial_strength: f64,
    /// Scales how slowly memory decays (higher = slower)
    pub decay_rate: f64,
    /// Predicted retention at which a review is scheduled
    pub retrieval_threshold: f64,
}

impl Default for ForgettingCurveConfig {
    fn default() -> Self {
        Self {
            initial_strength: 2.5,
            decay_rate: 0.5,
            retrieval_threshold: 0.90,
        }
    }
}

/// Response-time thresholds in seconds
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponseTimeConfig {
    pub fast_secs: f64,
    pub slow_secs: f64,
}

impl Default for ResponseTimeConfig {
    fn default() -> Self {
        Self {
            fast_secs: 3.0,
            slow_secs: 15.0,
        }
    }
}

/// Session building parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Share of the session filled before the category constraint relaxes
    pub diversity_ratio: f64,
    /// Distinct categories that must be seen before the constraint applies
    pub min_categories: usize,
    pub default_session_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            diversity_ratio: 0.7,
            min_categories: 3,
            default_session_size: 10,
        }
    }
}

/// Tunables for the knowledge tracker
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Attempts required before an item leaves the `new` level
    pub min_attempts: u32,
    pub forgetting: ForgettingCurveConfig,
    pub response_time: ResponseTimeConfig,
    pub session: SessionConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_attempts: 3,
            forgetting: ForgettingCurveConfig::default(),
            response_time: ResponseTimeConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Replace out-of-range values with their defaults.
    ///
    /// Every formula downstream divides by `decay_rate` or takes the log of
    /// `retrieval_threshold`, so those must stay strictly positive.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        let forgetting = &mut self.forgetting;
        if !(forgetting.decay_rate.is_finite() && forgetting.decay_rate > 0.0) {
            tracing::warn!("Invalid decay_rate {}, using default", forgetting.decay_rate);
            forgetting.decay_rate = defaults.forgetting.decay_rate;
        }
        if !(forgetting.retrieval_threshold > 0.0 && forgetting.retrieval_threshold < 1.0) {
            tracing::warn!(
                "Invalid retrieval_threshold {}, using default",
                forgetting.retrieval_threshold
            );
            forgetting.retrieval_threshold = defaults.forgetting.retrieval_threshold;
        }
        if !(forgetting.initial_strength.is_finite() && forgetting.initial_strength >= 0.0) {
            tracing::warn!("Invalid initial_strength {}, using default", forgetting.initial_strength);
            forgetting.initial_strength = defaults.forgetting.initial_strength;
        }
        if !(self.session.diversity_ratio >= 0.0 && self.session.diversity_ratio <= 1.0) {
            tracing::warn!("Invalid diversity_ratio {}, using default", self.session.diversity_ratio);
            self.session.diversity_ratio = defaults.session.diversity_ratio;
        }
        if self.response_time.fast_secs > self.response_time.slow_secs {
            tracing::warn!("fast_secs exceeds slow_secs, using default response thresholds");
            self.response_time = defaults.response_time;
        }
        self
    }
}

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    database: Option<DatabaseConfig>,
    tracker: Option<TrackerConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

/// Fully resolved settings for the command-line driver
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub tracker: TrackerConfig,
}

/// Default database location
pub const DEFAULT_DATABASE_PATH: &str = "data/knowledge.db";

fn read_config_file() -> AppConfig {
    let Ok(contents) = std::fs::read_to_string("config.toml") else {
        return AppConfig::default();
    };
    match toml::from_str::<AppConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring malformed config.toml: {}", e);
            AppConfig::default()
        }
    }
}

/// Load settings with priority: config.toml > .env > default
pub fn load_settings() -> Settings {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file = read_config_file();
    let tracker = file.tracker.unwrap_or_default().validated();

    // Priority 1: config.toml
    if let Some(path) = file.database.and_then(|db| db.path) {
        tracing::info!("Using database from config.toml: {}", path);
        return Settings {
            database_path: PathBuf::from(path),
            tracker,
        };
    }

    // Priority 2: .env ES_NOTEBOOK_DB
    if let Ok(path) = std::env::var("ES_NOTEBOOK_DB") {
        tracing::info!("Using database from ES_NOTEBOOK_DB env: {}", path);
        return Settings {
            database_path: PathBuf::from(path),
            tracker,
        };
    }

    let database_path = PathBuf::from(DEFAULT_DATABASE_PATH);
    tracing::info!("Using default database path: {}", database_path.display());
    Settings {
        database_path,
        tracker,
    }
}
