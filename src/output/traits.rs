//! Output handler traits and types
//!
//! This module defines the trait interface for incremental output handlers and the run
//! summary derived from written outcomes.

use crate::state::{Account, CrawlOutcome, RunProgress};
use crate::storage::{RunStatus, StorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Output already finalized")]
    Finalized,

    #[error("No runs recorded in the journal")]
    NoRuns,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Locations of one run's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Flat list of post references
    pub reference_list: PathBuf,

    /// Long-form structured document
    pub document: PathBuf,
}

/// One account line of the run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub account: Account,
    pub kind: &'static str,
    pub posts: usize,
    pub unavailable: usize,
    pub reason: Option<String>,
}

/// Totals over every written outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata
    pub run_id: Option<i64>,
    pub status: String,
    pub total_accounts: usize,
    pub restarts: u32,

    // Outcome breakdown
    pub succeeded: usize,
    pub no_new_posts: usize,
    pub failed: usize,

    // Posts
    pub total_posts: usize,
    pub unavailable_posts: usize,

    /// One entry per written account, in completion order
    pub accounts: Vec<AccountSummary>,
}

impl RunSummary {
    /// Builds a summary from outcomes in completion order
    pub fn from_outcomes<'a>(
        total_accounts: usize,
        outcomes: impl IntoIterator<Item = (&'a Account, &'a CrawlOutcome)>,
    ) -> Self {
        let mut summary = Self {
            total_accounts,
            ..Self::default()
        };

        for (account, outcome) in outcomes {
            match outcome {
                CrawlOutcome::Success(_) => summary.succeeded += 1,
                CrawlOutcome::NoNewPosts => summary.no_new_posts += 1,
                CrawlOutcome::Failed(_) => summary.failed += 1,
            }
            summary.total_posts += outcome.post_count();
            summary.unavailable_posts += outcome.unavailable_count();
            summary.accounts.push(AccountSummary {
                account: account.clone(),
                kind: outcome.to_db_string(),
                posts: outcome.post_count(),
                unavailable: outcome.unavailable_count(),
                reason: outcome.failure_reason().map(str::to_string),
            });
        }

        summary
    }

    /// Accounts with a written outcome
    pub fn written(&self) -> usize {
        self.accounts.len()
    }

    /// Accounts never dispatched (only non-zero after a halted run)
    pub fn not_dispatched(&self) -> usize {
        self.total_accounts.saturating_sub(self.written())
    }
}

/// Trait for incremental output handlers
///
/// Outcomes arrive in completion order. Each call must be durable before it returns.
pub trait OutputHandler: Send {
    /// Appends one account's outcome
    ///
    /// # Arguments
    ///
    /// * `account` - The crawled account
    /// * `outcome` - Its terminal outcome
    ///
    /// # Returns
    ///
    /// The run progress including this outcome
    fn record_outcome(
        &mut self,
        account: &Account,
        outcome: &CrawlOutcome,
    ) -> OutputResult<RunProgress>;

    /// Closes the artifacts
    ///
    /// # Arguments
    ///
    /// * `status` - The final status of the crawl run
    fn finalize(&mut self, status: RunStatus) -> OutputResult<()>;

    /// Journal run ID, when a journal is attached
    fn run_id(&self) -> Option<i64>;

    /// Where the artifacts are written
    fn paths(&self) -> ArtifactPaths;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PostEntry, PostIdentifier};

    #[test]
    fn test_run_summary_counts() {
        let a = Account::parse("a").unwrap();
        let b = Account::parse("b").unwrap();
        let c = Account::parse("c").unwrap();
        let success = CrawlOutcome::Success(vec![PostEntry::Unavailable {
            identifier: PostIdentifier::parse("1").unwrap(),
        }]);
        let none = CrawlOutcome::NoNewPosts;
        let failed = CrawlOutcome::Failed("timeout after 120s".into());

        let summary =
            RunSummary::from_outcomes(4, [(&a, &success), (&b, &none), (&c, &failed)]);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.no_new_posts, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_posts, 1);
        assert_eq!(summary.unavailable_posts, 1);
        assert_eq!(summary.written(), 3);
        assert_eq!(summary.not_dispatched(), 1);
        assert_eq!(
            summary.accounts[2].reason.as_deref(),
            Some("timeout after 120s")
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::from_outcomes(0, std::iter::empty());
        assert_eq!(summary.written(), 0);
        assert_eq!(summary.not_dispatched(), 0);
    }
}
