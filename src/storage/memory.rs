//! In-memory key-value backend
//!
//! Used as the test double for the shared store and for single-process runs
//! where nothing needs to outlive the process.

use crate::storage::traits::{KvBackend, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A `KvBackend` backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn increment(&self, key: &str) -> StorageResult<i64> {
        let mut entries = self.lock()?;
        let current = match entries.get(key) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| StorageError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                })?,
            None => 0,
        };
        let next = current + 1;
        entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }
}
