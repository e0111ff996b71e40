//! Offline regeneration of run artifacts from the journal

use crate::output::traits::{ArtifactPaths, OutputError, OutputResult};
use crate::output::writer::artifact_paths;
use crate::output::{markdown, reference_list};
use crate::state::RunProgress;
use crate::storage::{OutcomeRecord, RunRecord, Storage};
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::path::Path;

/// Rebuilds both artifacts of a run from its journaled outcomes
///
/// The files get the same names and layout as the live output, so an export replaces a
/// damaged or missing artifact in place.
///
/// # Arguments
///
/// * `storage` - The journal to read
/// * `run_id` - Run to export; the latest run when `None`
/// * `results_dir` - Directory for the regenerated files
///
/// # Returns
///
/// * `Ok((RunRecord, ArtifactPaths))` - The exported run and where it was written
/// * `Err(OutputError)` - The run does not exist or a file could not be written
pub fn export_run(
    storage: &dyn Storage,
    run_id: Option<i64>,
    results_dir: &Path,
) -> OutputResult<(RunRecord, ArtifactPaths)> {
    let run = match run_id {
        Some(id) => storage.get_run(id)?,
        None => storage.get_latest_run()?.ok_or(OutputError::NoRuns)?,
    };
    let outcomes = storage.load_outcomes(run.id)?;
    let started_at = run.started_at()?;

    let (reference_text, document_text) = render_run(&run, &started_at, &outcomes);

    fs::create_dir_all(results_dir)?;
    let paths = artifact_paths(results_dir, &started_at);
    fs::write(&paths.reference_list, reference_text)?;
    fs::write(&paths.document, document_text)?;

    tracing::info!(
        "Exported run {} ({} outcomes) to {}",
        run.id,
        outcomes.len(),
        paths.reference_list.display()
    );
    Ok((run, paths))
}

/// Renders the full reference list and document of a journaled run
pub fn render_run(
    run: &RunRecord,
    started_at: &DateTime<FixedOffset>,
    outcomes: &[OutcomeRecord],
) -> (String, String) {
    let mut reference_text = reference_list::render_header(started_at, run.total_accounts);
    let mut document_text = markdown::render_header(started_at, run.total_accounts);

    let mut progress = RunProgress::new(run.total_accounts);
    let mut total_posts = 0;
    let mut unavailable_posts = 0;

    for record in outcomes {
        let tag = progress.advance();
        total_posts += record.outcome.post_count();
        unavailable_posts += record.outcome.unavailable_count();

        reference_text.push_str(&reference_list::render_block(
            &record.account,
            &record.outcome,
            tag,
        ));
        document_text.push_str(&markdown::render_section(
            &record.account,
            &record.outcome,
            tag,
        ));
    }

    let completed_at = completion_time(run, outcomes).unwrap_or(*started_at);
    reference_text.push_str(&reference_list::render_footer(
        &completed_at,
        total_posts,
        run.status,
    ));
    document_text.push_str(&markdown::render_footer(
        &completed_at,
        progress.completed,
        total_posts,
        unavailable_posts,
        run.status,
    ));

    (reference_text, document_text)
}

/// Finish time of the run, or the last recorded outcome for a run that never finished
fn completion_time(run: &RunRecord, outcomes: &[OutcomeRecord]) -> Option<DateTime<FixedOffset>> {
    run.finished_at
        .as_deref()
        .or_else(|| outcomes.last().map(|o| o.recorded_at.as_str()))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
}
