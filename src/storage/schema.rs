//! Database schema definitions
//!
//! The SQLite backend stores the whole shared namespace in a single key-value table;
//! job isolation comes from key prefixes, not from separate tables.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Shared key-value namespace for all crawl jobs
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
