pub mod buckets;
pub mod schema;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StorageError;
use crate::storage::StateStorage;

pub use schema::run_migrations;

/// Turn a failure into `None` after logging it at warn level
pub trait LogOnError<T> {
  fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    self
      .map_err(|e| tracing::warn!("{}: {}", context, e))
      .ok()
  }
}

/// SQLite-backed blob storage, one row per bucket key
#[derive(Debug)]
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (creating if needed) the database at `path` and run migrations.
  ///
  /// An existing file is copied to `<name>.db.backup` first.
  pub fn open(path: &Path) -> Result<Self, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }

    // Create backup before migrations if database exists
    if path.exists() {
      let backup_path = path.with_extension("db.backup");
      std::fs::copy(path, &backup_path)
        .map(|_| ())
        .log_warn("Could not create database backup");
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    tracing::info!("Opened knowledge database at {}", path.display());
    Ok(Self::from_connection(conn))
  }

  pub fn open_in_memory() -> Result<Self, StorageError> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(Self::from_connection(conn))
  }

  fn from_connection(conn: Connection) -> Self {
    Self {
      conn: Mutex::new(conn),
    }
  }

  /// Acquire the connection, returning an error if the lock is poisoned
  fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
    self.conn.lock().map_err(|_: PoisonError<_>| {
      tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
      StorageError::LockPoisoned
    })
  }

  /// When the bucket under `key` was last saved, if known
  pub fn last_saved_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
    let conn = self.lock()?;
    Ok(buckets::bucket_updated_at(&conn, key)?)
  }
}

impl StateStorage for SqliteStorage {
  fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
    let conn = self.lock()?;
    Ok(buckets::get_bucket(&conn, key)?)
  }

  fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
    let conn = self.lock()?;
    Ok(buckets::put_bucket(&conn, key, blob)?)
  }

  /// All buckets are written in one transaction
  fn save_all(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    for (key, blob) in entries {
      buckets::put_bucket(&tx, key, blob)?;
    }
    tx.commit()?;
    Ok(())
  }
}
