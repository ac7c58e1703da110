pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod srs;
pub mod storage;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, StorageError};
pub use storage::{MemoryStorage, StateStorage};
pub use store::KnowledgeStore;
