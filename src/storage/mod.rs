//! Storage module for the run journal
//!
//! This module records every crawl run and every written account outcome in SQLite, including:
//! - Run lifecycle (start time, config hash, final status)
//! - One row per completed account, committed atomically
//! - Loading a past run's outcomes for offline regeneration of the artifacts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{Account, CrawlOutcome};
use chrono::{DateTime, FixedOffset};
use std::path::Path;

/// Opens or creates the journal database, creating its parent directory if needed
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub total_accounts: usize,
}

impl RunRecord {
    /// Parses the stored start time
    pub fn started_at(&self) -> StorageResult<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.started_at)
            .map_err(|e| StorageError::Serialization(format!("started_at: {}", e)))
    }
}

/// Represents one recorded account outcome
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub run_id: i64,
    pub position: usize,
    pub account: Account,
    pub outcome: CrawlOutcome,
    pub recorded_at: String,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    RecoveryExhausted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::RecoveryExhausted => "recovery_exhausted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "recovery_exhausted" => Some(Self::RecoveryExhausted),
            _ => None,
        }
    }
}
