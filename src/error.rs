//! Error types for the persistence boundary and the command-line driver.
//!
//! The scheduling core itself is infallible; only storage and I/O can fail.

/// Failure while loading or saving state blobs
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("Database error: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Serialization error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Storage unavailable: lock poisoned")]
  LockPoisoned,
}

/// Top-level error for the command-line driver
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Storage(#[from] StorageError),
  #[error("Invalid argument: {0}")]
  Config(String),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
