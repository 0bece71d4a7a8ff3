//! # The CLI: Batch Return-Type Annotation
//!
//! **Role**: Glue between the command line and the engine. Lists the source
//! files under a root, loads the ambient package set, fans the files out to
//! a bounded worker pool and reports per-file results.
//!
//! **Design**:
//! - Options are resolved once from [`Args`] and shared read-only.
//! - One oracle for the run; one parser host per file.
//! - The first per-file failure ends the run with an error.

pub mod args;
pub mod report;
pub mod schedule;

use std::path::PathBuf;
use std::sync::Arc;

use anatomist::{list_source_files, Annotator, FileReport};
use anyhow::Context;
use oracle::SyntacticOracle;
use scribe::SafeWriter;
use tracing::info;

pub use args::Args;
pub use report::RunSummary;

/// Result of a whole run: the resolved root and one report per file.
#[derive(Debug)]
pub struct RunOutcome {
    pub root: PathBuf,
    pub reports: Vec<FileReport>,
}

/// Runs the annotator as configured by `args`.
///
/// # Errors
/// An unusable root, an invalid ignore glob, or the first file that could
/// not be read or written.
pub async fn run(args: &Args) -> anyhow::Result<RunOutcome> {
    let root = dunce::canonicalize(&args.path)
        .with_context(|| format!("cannot resolve root {}", args.path.display()))?;
    let files = list_source_files(&root, &args.scan_options())?;
    info!(root = %root.display(), files = files.len(), "listed source files");

    let oracle = SyntacticOracle::for_root(&root);
    let annotator = Arc::new(Annotator::new(
        Arc::new(oracle),
        args.annotate_options(),
        SafeWriter::new(args.dry_run),
    ));
    let reports = schedule::annotate_all(annotator, files, args.concurrency).await?;

    // Status lines are relative to the directory, even for a single-file root.
    let root = if root.is_file() {
        root.parent().map(PathBuf::from).unwrap_or(root)
    } else {
        root
    };
    Ok(RunOutcome { root, reports })
}
