//! Output module for run artifacts and summaries
//!
//! This module handles:
//! - Appending each account outcome to the reference list and markdown document as it completes
//! - Journaling outcomes so both artifacts can be regenerated offline
//! - Summarizing a run for the terminal

mod export;
pub mod markdown;
pub mod reference_list;
pub mod stats;
mod traits;
mod writer;

pub use export::{export_run, render_run};
pub use stats::{format_summary, load_summary, print_summary};
pub use traits::{
    AccountSummary, ArtifactPaths, OutputError, OutputHandler, OutputResult, RunSummary,
};
pub use writer::{artifact_paths, ResultWriter};
