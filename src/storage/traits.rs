//! Storage traits and error types
//!
//! This module defines the trait interface for the run journal and its error types.

use crate::state::{Account, CrawlOutcome};
use crate::storage::{OutcomeRecord, RunRecord, RunStatus};
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run journal backends
///
/// The journal holds exactly the accounts whose outcome was fully written. Each outcome is
/// committed atomically, so a crash leaves either the whole entry or nothing.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `started_at` - Run start time, also used to name the output artifacts
    /// * `config_hash` - Hash of the configuration file
    /// * `total_accounts` - Number of accounts the run intends to crawl
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(
        &mut self,
        started_at: DateTime<FixedOffset>,
        config_hash: &str,
        total_accounts: usize,
    ) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Outcomes =====

    /// Records one account's outcome in a single transaction
    ///
    /// # Arguments
    ///
    /// * `run_id` - The run the outcome belongs to
    /// * `position` - Completion position, starting at 1
    /// * `account` - The crawled account
    /// * `outcome` - The account's terminal outcome
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The outcome is committed
    /// * `Err(StorageError::ConstraintViolation)` - The account or position is already recorded
    fn record_outcome(
        &mut self,
        run_id: i64,
        position: usize,
        account: &Account,
        outcome: &CrawlOutcome,
    ) -> StorageResult<()>;

    /// Loads a run's outcomes in completion order
    fn load_outcomes(&self, run_id: i64) -> StorageResult<Vec<OutcomeRecord>>;

    /// Counts the outcomes recorded for a run
    fn count_outcomes(&self, run_id: i64) -> StorageResult<usize>;
}
