//! Namespaced per-job state on top of a shared `KvBackend`
//!
//! Every key is `{job}__{kind}[__{url}]` with the job id and URL escaped by `sanitize_key`,
//! so unrelated jobs sharing one backend never see each other's state and two URLs never
//! share a marker. None of the operations below are atomic with respect to each other:
//! two tasks may both see a URL as unvisited, the page counter is a soft cap, and the job
//! configuration is first-write-wins only in the absence of a concurrent seed.

use crate::crawler::{JobConfig, JobId};
use crate::storage::traits::{KvBackend, StorageError, StorageResult};
use std::sync::Arc;

/// Separates the segments of a store key
///
/// `sanitize_key` never emits two consecutive underscores, so splitting on this separator
/// recovers the original segments.
pub const KEY_SEPARATOR: &str = "__";

/// Escapes one segment of a store key
///
/// ASCII letters and digits pass through. Every other byte, `_` included, becomes `_` plus
/// two lowercase hex digits, so the output stays within `[A-Za-z0-9_]` and distinct inputs
/// always give distinct keys.
pub fn sanitize_key(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() {
            escaped.push(byte as char);
        } else {
            escaped.push('_');
            escaped.push_str(&hex::encode([byte]));
        }
    }
    escaped
}

/// Job-scoped view of the shared key-value store
#[derive(Clone)]
pub struct JobStateStore {
    backend: Arc<dyn KvBackend>,
    job_id: JobId,
}

impl JobStateStore {
    pub fn new(backend: Arc<dyn KvBackend>, job_id: JobId) -> Self {
        Self { backend, job_id }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}{}", sanitize_key(self.job_id.as_str()), KEY_SEPARATOR, suffix)
    }

    fn config_key(&self) -> String {
        self.key("config")
    }

    /// Common prefix of every visited marker of this job
    pub fn visited_prefix(&self) -> String {
        format!("{}{}", self.key("visited"), KEY_SEPARATOR)
    }

    fn visited_key(&self, normalized_url: &str) -> String {
        format!("{}{}", self.visited_prefix(), sanitize_key(normalized_url))
    }

    fn page_count_key(&self) -> String {
        self.key("pageCount")
    }

    fn aborted_key(&self) -> String {
        self.key("aborted")
    }

    /// Reads the job configuration written by the seed task
    pub async fn get_config(&self) -> StorageResult<Option<JobConfig>> {
        match self.backend.get(&self.config_key()).await? {
            Some(raw) => {
                let config = serde_json::from_str(&raw)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    /// Writes the job configuration unless one is already stored
    ///
    /// Returns `true` if this call wrote the value. The check and the write are two
    /// separate store operations, so two concurrent seeds may both write; the last
    /// write wins.
    pub async fn set_config_if_absent(&self, config: &JobConfig) -> StorageResult<bool> {
        let key = self.config_key();
        if self.backend.get(&key).await?.is_some() {
            return Ok(false);
        }

        let raw =
            serde_json::to_string(config).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(&key, &raw).await?;
        Ok(true)
    }

    /// Checks the visited marker for an already-normalized URL
    pub async fn is_visited(&self, normalized_url: &str) -> StorageResult<bool> {
        Ok(self
            .backend
            .get(&self.visited_key(normalized_url))
            .await?
            .is_some())
    }

    /// Sets the visited marker for an already-normalized URL
    pub async fn mark_visited(&self, normalized_url: &str) -> StorageResult<()> {
        self.backend
            .set(&self.visited_key(normalized_url), "1")
            .await
    }

    /// Current page count, 0 when nothing was processed yet
    pub async fn page_count(&self) -> StorageResult<u64> {
        let key = self.page_count_key();
        match self.backend.get(&key).await? {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| StorageError::InvalidValue { key, value: raw }),
            None => Ok(0),
        }
    }

    /// Increments the page count and returns the new value
    pub async fn increment_page_count(&self) -> StorageResult<u64> {
        let next = self.backend.increment(&self.page_count_key()).await?;
        Ok(next.max(0) as u64)
    }

    /// Returns true once the job has been aborted
    pub async fn is_aborted(&self) -> StorageResult<bool> {
        Ok(self.backend.get(&self.aborted_key()).await?.is_some())
    }

    /// Marks the job aborted; tasks that start afterwards skip immediately
    pub async fn abort(&self) -> StorageResult<()> {
        self.backend.set(&self.aborted_key(), "1").await
    }
}
