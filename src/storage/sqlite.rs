//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{Account, CrawlOutcome, PostEntry};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{OutcomeRecord, RunRecord, RunStatus};
use chrono::{DateTime, FixedOffset, Local};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, total_accounts";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Every committed outcome must survive a crash
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        total_accounts: row.get::<_, i64>(5)? as usize,
    })
}

/// Raw outcome columns before decoding
struct OutcomeRow {
    run_id: i64,
    position: i64,
    account: String,
    kind: String,
    reason: Option<String>,
    posts_json: String,
    recorded_at: String,
}

impl OutcomeRow {
    fn decode(self) -> StorageResult<OutcomeRecord> {
        let account = Account::parse(&self.account)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let outcome = match self.kind.as_str() {
            "success" => {
                let entries: Vec<PostEntry> = serde_json::from_str(&self.posts_json)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                CrawlOutcome::Success(entries)
            }
            "no_new_posts" => CrawlOutcome::NoNewPosts,
            "failed" => CrawlOutcome::Failed(self.reason.unwrap_or_default()),
            other => {
                return Err(StorageError::Serialization(format!(
                    "unknown outcome kind {:?}",
                    other
                )))
            }
        };

        Ok(OutcomeRecord {
            run_id: self.run_id,
            position: self.position as usize,
            account,
            outcome,
            recorded_at: self.recorded_at,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        started_at: DateTime<FixedOffset>,
        config_hash: &str,
        total_accounts: usize,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, total_accounts)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                started_at.to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string(),
                total_accounts as i64
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Local::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Outcomes =====

    fn record_outcome(
        &mut self,
        run_id: i64,
        position: usize,
        account: &Account,
        outcome: &CrawlOutcome,
    ) -> StorageResult<()> {
        let posts_json = serde_json::to_string(outcome.entries())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let now = Local::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO outcomes (run_id, position, account, kind, reason, posts_json, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                position as i64,
                account.handle(),
                outcome.to_db_string(),
                outcome.failure_reason(),
                posts_json,
                now
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StorageError::ConstraintViolation(format!(
                    "{} already recorded for run {}",
                    account, run_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(())
    }

    fn load_outcomes(&self, run_id: i64) -> StorageResult<Vec<OutcomeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, position, account, kind, reason, posts_json, recorded_at
             FROM outcomes WHERE run_id = ?1 ORDER BY position",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(OutcomeRow {
                    run_id: row.get(0)?,
                    position: row.get(1)?,
                    account: row.get(2)?,
                    kind: row.get(3)?,
                    reason: row.get(4)?,
                    posts_json: row.get(5)?,
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(OutcomeRow::decode).collect()
    }

    fn count_outcomes(&self, run_id: i64) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM outcomes WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
