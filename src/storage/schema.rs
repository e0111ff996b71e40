//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the run journal.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    total_accounts INTEGER NOT NULL
);

-- One row per completed account, in completion order
CREATE TABLE IF NOT EXISTS outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    position INTEGER NOT NULL,
    account TEXT NOT NULL,
    kind TEXT NOT NULL,
    reason TEXT,
    posts_json TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE(run_id, account),
    UNIQUE(run_id, position)
);

CREATE INDEX IF NOT EXISTS idx_outcomes_run ON outcomes(run_id);
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
