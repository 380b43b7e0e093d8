//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `KvBackend` trait.
//! Several processes may open the same database file; WAL mode plus a busy timeout
//! lets their short reads and writes interleave. Each store call runs on tokio's blocking
//! pool so a busy database never stalls the async workers.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{KvBackend, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// SQLite key-value backend
pub struct SqliteKv {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKv {
    /// Opens (or creates) a SQLite-backed store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteKv)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for concurrent short transactions
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database (for tests and throwaway runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Counts the keys starting with `prefix`
    pub fn count_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let conn = self.lock()?;
        let pattern = format!("{}%", escape_like(prefix));
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM kv WHERE key LIKE ?1 ESCAPE '\\'",
            params![pattern],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_conn(&self.conn)
    }

    /// Runs `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_conn(&conn)?;
            op(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("sqlite task failed: {}", e)))?
    }
}

fn lock_conn(conn: &Mutex<Connection>) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StorageError::Backend("sqlite connection lock poisoned".to_string()))
}

/// Escapes LIKE wildcards so a prefix matches literally
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl KvBackend for SqliteKv {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn increment(&self, key: &str) -> StorageResult<i64> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current: Option<String> = tx
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;

            let current = match current {
                Some(value) => value
                    .parse::<i64>()
                    .map_err(|_| StorageError::InvalidValue {
                        key: key.clone(),
                        value,
                    })?,
                None => 0,
            };
            let next = current + 1;

            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, next.to_string(), now],
            )?;
            tx.commit()?;

            Ok(next)
        })
        .await
    }
}
