//! Flat reference list rendering
//!
//! The reference list is a plain text file: `#` lines describe the run and each account, and
//! every other non-empty line is one post URL. Renderers are pure so the live writer and the
//! offline export produce the same text.

use crate::state::{Account, CrawlOutcome, PostEntry, RunProgress};
use crate::storage::RunStatus;
use chrono::{DateTime, FixedOffset};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats the list header
///
/// # Arguments
///
/// * `started_at` - Run start time
/// * `total_accounts` - Number of accounts the run intends to crawl
pub fn render_header(started_at: &DateTime<FixedOffset>, total_accounts: usize) -> String {
    format!(
        "# Crawl Results - {}\n# Total accounts: {}\n# Started at: {}\n\n",
        started_at.format(TIME_FORMAT),
        total_accounts,
        started_at.to_rfc3339()
    )
}

/// Formats one account block, tagged with its progress
pub fn render_block(account: &Account, outcome: &CrawlOutcome, progress: RunProgress) -> String {
    let mut out = match outcome {
        CrawlOutcome::Success(entries) => {
            format!("# {} ({} posts) - {}\n", account, entries.len(), progress)
        }
        CrawlOutcome::NoNewPosts => format!("# {} (no new posts) - {}\n", account, progress),
        CrawlOutcome::Failed(reason) => {
            format!("# {} (failed: {}) - {}\n", account, reason, progress)
        }
    };

    for entry in outcome.entries() {
        match entry {
            PostEntry::Resolved(content) => {
                out.push_str(&content.identifier.url());
                out.push('\n');
            }
            PostEntry::Unavailable { identifier } => {
                out.push_str(&format!("{}  # content unavailable\n", identifier.url()));
            }
        }
    }

    out.push('\n');
    out
}

/// Formats the closing lines of the list
pub fn render_footer(
    completed_at: &DateTime<FixedOffset>,
    total_posts: usize,
    status: RunStatus,
) -> String {
    let mut out = format!(
        "# Completed at: {}\n# Total posts: {}\n",
        completed_at.format(TIME_FORMAT),
        total_posts
    );
    if status != RunStatus::Completed {
        out.push_str(&format!("# Status: {}\n", status.to_db_string()));
    }
    out
}
