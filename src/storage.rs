//! Key-value storage port for knowledge-state blobs.
//!
//! The store never reaches for a global backend; callers hand it something
//! implementing [`StateStorage`]. [`crate::db::SqliteStorage`] is the durable
//! implementation, [`MemoryStorage`] the in-process one used by tests and
//! one-off runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

/// Load/save primitives for opaque string blobs
pub trait StateStorage {
  fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn save(&self, key: &str, blob: &str) -> Result<(), StorageError>;

  /// Write several blobs. Backends that can should apply all or none.
  fn save_all(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
    for (key, blob) in entries {
      self.save(key, blob)?;
    }
    Ok(())
  }
}

/// Process-local storage backed by a map
#[derive(Debug, Default)]
pub struct MemoryStorage {
  blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
    self.blobs.lock().map_err(|_| {
      tracing::error!("Memory storage mutex poisoned");
      StorageError::LockPoisoned
    })
  }

  /// Stored keys, sorted
  pub fn keys(&self) -> Result<Vec<String>, StorageError> {
    let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
    keys.sort();
    Ok(keys)
  }
}

impl StateStorage for MemoryStorage {
  fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
    self.lock()?.insert(key.to_string(), blob.to_string());
    Ok(())
  }

  fn save_all(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
    let mut blobs = self.lock()?;
    for (key, blob) in entries {
      blobs.insert(key.to_string(), blob.clone());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_storage_roundtrip() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.load("missing").unwrap(), None);

    storage.save("bucket", "{}").unwrap();
    assert_eq!(storage.load("bucket").unwrap().as_deref(), Some("{}"));

    storage.save("bucket", "{\"a\":1}").unwrap();
    assert_eq!(storage.load("bucket").unwrap().as_deref(), Some("{\"a\":1}"));
  }

  #[test]
  fn test_save_all_writes_every_entry() {
    let storage = MemoryStorage::new();
    storage.save("a", "old").unwrap();
    storage
      .save_all(&[("a", "new".to_string()), ("b", "{}".to_string())])
      .unwrap();
    assert_eq!(storage.load("a").unwrap().as_deref(), Some("new"));
    assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn test_keys_sorted() {
    let storage = MemoryStorage::new();
    storage.save("b", "1").unwrap();
    storage.save("a", "2").unwrap();
    assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
  }
}
