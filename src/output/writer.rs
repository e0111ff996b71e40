//! Incremental result writer
//!
//! `ResultWriter` owns both run artifacts and the optional journal. Each outcome is committed
//! to the journal first, then appended to the reference list and the markdown document and
//! synced to disk before the call returns.

use crate::output::traits::{ArtifactPaths, OutputError, OutputHandler, OutputResult};
use crate::output::{markdown, reference_list};
use crate::state::{Account, CrawlOutcome, RunProgress};
use crate::storage::{RunStatus, Storage};
use chrono::{DateTime, FixedOffset, Local};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Journal attached to a writer
struct Journal {
    storage: Box<dyn Storage + Send>,
    run_id: i64,
}

/// Append-only writer for one run's artifacts
pub struct ResultWriter {
    reference_list: File,
    document: File,
    paths: ArtifactPaths,
    started_at: DateTime<FixedOffset>,
    progress: RunProgress,
    total_posts: usize,
    unavailable_posts: usize,
    journal: Option<Journal>,
    finalized: bool,
}

/// Artifact paths for a run started at `started_at`
///
/// # Arguments
///
/// * `results_dir` - Directory holding the artifacts
/// * `started_at` - Run start time; names both files
pub fn artifact_paths(results_dir: &Path, started_at: &DateTime<FixedOffset>) -> ArtifactPaths {
    let stamp = started_at.format("%Y%m%d_%H%M%S");
    ArtifactPaths {
        reference_list: results_dir.join(format!("posts_{}.txt", stamp)),
        document: results_dir.join(format!("posts_{}.md", stamp)),
    }
}

/// Writes `text` and forces it to disk
fn append_synced(file: &mut File, text: &str) -> std::io::Result<()> {
    file.write_all(text.as_bytes())?;
    file.flush()?;
    file.sync_data()
}

impl ResultWriter {
    /// Creates both artifacts and writes their headers
    ///
    /// # Arguments
    ///
    /// * `results_dir` - Directory for the artifacts, created if missing
    /// * `started_at` - Run start time
    /// * `total_accounts` - Number of accounts the run intends to crawl
    ///
    /// # Returns
    ///
    /// * `Ok(ResultWriter)` - Both files exist and carry their headers
    /// * `Err(OutputError)` - A file could not be created
    pub fn create(
        results_dir: &Path,
        started_at: DateTime<FixedOffset>,
        total_accounts: usize,
    ) -> OutputResult<Self> {
        fs::create_dir_all(results_dir)?;
        let paths = artifact_paths(results_dir, &started_at);

        let mut reference_list = File::create(&paths.reference_list)?;
        let mut document = File::create(&paths.document)?;
        append_synced(
            &mut reference_list,
            &reference_list::render_header(&started_at, total_accounts),
        )?;
        append_synced(
            &mut document,
            &markdown::render_header(&started_at, total_accounts),
        )?;

        tracing::info!(
            "Writing results to {} and {}",
            paths.reference_list.display(),
            paths.document.display()
        );

        Ok(Self {
            reference_list,
            document,
            paths,
            started_at,
            progress: RunProgress::new(total_accounts),
            total_posts: 0,
            unavailable_posts: 0,
            journal: None,
            finalized: false,
        })
    }

    /// Attaches a journal and opens a run in it
    ///
    /// # Arguments
    ///
    /// * `storage` - Journal backend
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    pub fn with_journal(
        mut self,
        mut storage: Box<dyn Storage + Send>,
        config_hash: &str,
    ) -> OutputResult<Self> {
        let run_id = storage.create_run(self.started_at, config_hash, self.progress.total)?;
        tracing::info!("Journal run {} started", run_id);

        self.journal = Some(Journal { storage, run_id });
        Ok(self)
    }

    pub fn progress(&self) -> RunProgress {
        self.progress
    }
}

impl OutputHandler for ResultWriter {
    fn record_outcome(
        &mut self,
        account: &Account,
        outcome: &CrawlOutcome,
    ) -> OutputResult<RunProgress> {
        if self.finalized {
            return Err(OutputError::Finalized);
        }

        let position = self.progress.completed + 1;
        if let Some(journal) = self.journal.as_mut() {
            journal
                .storage
                .record_outcome(journal.run_id, position, account, outcome)?;
        }

        let progress = self.progress.advance();
        self.total_posts += outcome.post_count();
        self.unavailable_posts += outcome.unavailable_count();

        append_synced(
            &mut self.reference_list,
            &reference_list::render_block(account, outcome, progress),
        )?;
        append_synced(
            &mut self.document,
            &markdown::render_section(account, outcome, progress),
        )?;

        Ok(progress)
    }

    fn finalize(&mut self, status: RunStatus) -> OutputResult<()> {
        if self.finalized {
            return Err(OutputError::Finalized);
        }
        self.finalized = true;

        let completed_at = Local::now().fixed_offset();
        append_synced(
            &mut self.reference_list,
            &reference_list::render_footer(&completed_at, self.total_posts, status),
        )?;
        append_synced(
            &mut self.document,
            &markdown::render_footer(
                &completed_at,
                self.progress.completed,
                self.total_posts,
                self.unavailable_posts,
                status,
            ),
        )?;

        if let Some(journal) = self.journal.as_mut() {
            journal.storage.finish_run(journal.run_id, status)?;
        }

        tracing::debug!(
            "Finalized {} ({} posts, status {})",
            self.paths.reference_list.display(),
            self.total_posts,
            status.to_db_string()
        );
        Ok(())
    }

    fn run_id(&self) -> Option<i64> {
        self.journal.as_ref().map(|journal| journal.run_id)
    }

    fn paths(&self) -> ArtifactPaths {
        self.paths.clone()
    }
}
