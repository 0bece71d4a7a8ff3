//! Bounded fan-out of the per-file engine.
//!
//! Each file runs on the blocking pool with its own [`ParserHost`]; a
//! semaphore caps how many run at once. The first file that fails aborts
//! whatever has not started yet. Files already written stay written.

use std::path::PathBuf;
use std::sync::Arc;

use anatomist::{Annotator, FileReport, ParserHost};
use anyhow::Context;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Annotates every file in `files`, at most `concurrency` at a time.
///
/// Reports come back sorted by path.
///
/// # Errors
/// The first per-file failure (unreadable file, failed write) or a worker
/// that panicked.
pub async fn annotate_all(
    annotator: Arc<Annotator>,
    files: Vec<PathBuf>,
    concurrency: usize,
) -> anyhow::Result<Vec<FileReport>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for path in files {
        let semaphore = Arc::clone(&semaphore);
        let annotator = Arc::clone(&annotator);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("scheduler closed")?;
            tokio::task::spawn_blocking(move || annotate_one(&annotator, path))
                .await
                .context("annotation worker panicked")?
        });
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => Err(anyhow::Error::new(e).context("annotation task failed")),
        };
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(error = %format!("{e:#}"), "aborting run");
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    reports.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(reports)
}

fn annotate_one(annotator: &Annotator, path: PathBuf) -> anyhow::Result<FileReport> {
    let mut host = ParserHost::new()?;
    let report = annotator
        .process_file(&mut host, &path)
        .with_context(|| format!("failed to annotate {}", path.display()))?;
    debug!(file = %path.display(), annotated = report.annotated, "done");
    Ok(report)
}
