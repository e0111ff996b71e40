//! Run summary display
//!
//! This module builds the end-of-run summary from the journal and formats it for stdout.

use crate::output::traits::RunSummary;
use crate::storage::{RunRecord, Storage, StorageResult};

/// Loads the summary of a journaled run
///
/// # Arguments
///
/// * `storage` - The journal to query
/// * `run` - The run to summarize
///
/// # Returns
///
/// * `Ok(RunSummary)` - Totals over the run's recorded outcomes
/// * `Err(StorageError)` - Failed to load outcomes
pub fn load_summary(storage: &dyn Storage, run: &RunRecord) -> StorageResult<RunSummary> {
    let records = storage.load_outcomes(run.id)?;

    let mut summary = RunSummary::from_outcomes(
        run.total_accounts,
        records.iter().map(|r| (&r.account, &r.outcome)),
    );
    summary.run_id = Some(run.id);
    summary.status = run.status.to_db_string().to_string();

    Ok(summary)
}

/// Formats a run summary, one line per written account
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::from("=== Crawl Summary ===\n\n");

    if let Some(run_id) = summary.run_id {
        out.push_str(&format!("Run: {}\n", run_id));
    }
    if !summary.status.is_empty() {
        out.push_str(&format!("Status: {}\n", summary.status));
    }
    out.push_str(&format!(
        "Accounts: {} written of {}",
        summary.written(),
        summary.total_accounts
    ));
    if summary.not_dispatched() > 0 {
        out.push_str(&format!(" ({} never dispatched)", summary.not_dispatched()));
    }
    out.push('\n');
    out.push_str(&format!(
        "  success: {}  no new posts: {}  failed: {}\n",
        summary.succeeded, summary.no_new_posts, summary.failed
    ));
    out.push_str(&format!(
        "Posts: {} ({} content unavailable)\n",
        summary.total_posts, summary.unavailable_posts
    ));
    if summary.restarts > 0 {
        out.push_str(&format!("Channel restarts: {}\n", summary.restarts));
    }

    if !summary.accounts.is_empty() {
        out.push('\n');
        for line in &summary.accounts {
            match &line.reason {
                Some(reason) => {
                    out.push_str(&format!("  {:<20} failed: {}\n", line.account.to_string(), reason))
                }
                None if line.posts > 0 => out.push_str(&format!(
                    "  {:<20} {} posts ({} unavailable)\n",
                    line.account.to_string(),
                    line.posts,
                    line.unavailable
                )),
                None => out.push_str(&format!(
                    "  {:<20} {}\n",
                    line.account.to_string(),
                    line.kind.replace('_', " ")
                )),
            }
        }
    }

    out
}

/// Prints a run summary to stdout
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    print!("{}", format_summary(summary));
}
