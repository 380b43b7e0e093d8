//! Storage traits and error types
//!
//! This module defines the trait interface for key-value backends and
//! associated error types.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid value for key {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for the shared key-value backend
///
/// A backend is shared by every task of every job and must survive individual task
/// invocations. It offers plain reads and writes with no compare-and-set; callers must not
/// assume any atomicity across two calls.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Reads a value, `None` when the key was never written
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes a value, replacing any previous one (last write wins)
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Adds one to an integer value (absent counts as 0) and returns the new value
    ///
    /// Fails with `StorageError::InvalidValue` if the stored value is not an integer.
    async fn increment(&self, key: &str) -> StorageResult<i64>;
}
