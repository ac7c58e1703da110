//! Test utilities for database setup.
//!
//! Provides a throwaway SQLite-backed store that reuses the authoritative
//! schema initialization, so tests never duplicate the schema.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::db::SqliteStorage;
use crate::error::StorageError;

/// Test environment with a knowledge database in a temporary directory.
///
/// The directory and database are removed when dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// Storage opened through `SqliteStorage::open` (all migrations)
    pub storage: SqliteStorage,
}

impl TestEnv {
    /// Create a test environment with the database initialized.
    pub fn new() -> Result<Self, StorageError> {
        let temp = TempDir::new()?;
        let storage = SqliteStorage::open(&temp.path().join("knowledge.db"))?;
        Ok(Self { temp, storage })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Location of the database file
    pub fn db_path(&self) -> PathBuf {
        self.temp.path().join("knowledge.db")
    }

    /// Open a second connection to the same database, as a restarted process would
    pub fn reopen(&self) -> Result<SqliteStorage, StorageError> {
        SqliteStorage::open(&self.db_path())
    }
}
