//! Storage module for shared crawl state
//!
//! This module handles the key-value store every crawl task coordinates through:
//! - The `KvBackend` trait and its in-memory and SQLite implementations
//! - The job-namespaced `JobStateStore` (config, visited markers, page counter, abort flag)

mod job_store;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use job_store::{sanitize_key, JobStateStore};
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;
pub use traits::{KvBackend, StorageError, StorageResult};

use std::path::Path;
use std::sync::Arc;

/// Opens the shared store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file, or `None` for a process-local in-memory store
///
/// # Returns
///
/// * `Ok(Arc<dyn KvBackend>)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open the database
pub fn open_store(path: Option<&Path>) -> StorageResult<Arc<dyn KvBackend>> {
    match path {
        Some(path) => Ok(Arc::new(SqliteKv::new(path)?)),
        None => Ok(Arc::new(MemoryKv::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_store_in_memory() {
        let store = open_store(None).unwrap();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_open_store_sqlite_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.db");

        let store = open_store(Some(&path)).unwrap();
        store.set("k", "v").await.unwrap();

        assert!(path.exists());
    }
}
