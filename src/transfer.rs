// transfer module: per-source sync orchestration and run artifacts
mod engine;
mod report;

pub use engine::{RsyncEngine, SyncEngine};
pub use report::{RunArtifacts, SummaryWriter, outcome_line};

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::destination::ValidatedPath;
use crate::path_set::PathSet;
use crate::prompt::ProgressSink;
use crate::util::display_name;

/// Result of syncing one source. Failures are opaque; details live in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed { code: Option<i32>, reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub source: PathBuf,
    pub target: PathBuf,
    pub outcome: Outcome,
    /// Log or summary lines for this source that could not be written
    pub write_errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub records: Vec<TransferRecord>,
    pub log_path: PathBuf,
    pub summary_path: PathBuf,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
}

impl RunResult {
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }

    /// Sources whose log or summary lines were (partly) lost.
    pub fn with_write_errors(&self) -> usize {
        self.records.iter().filter(|r| !r.write_errors.is_empty()).count()
    }

    /// Exit status of the last failed source; a failure without a status counts as 1.
    pub fn last_failure_code(&self) -> Option<i32> {
        self.records.iter().rev().find_map(|r| match r.outcome {
            Outcome::Failed { code, .. } => Some(code.unwrap_or(1)),
            Outcome::Success => None,
        })
    }
}

// Artifact writes after the run has started never stop it; the failure is kept
// on the record and in the diagnostic log.
fn keep_going(res: Result<()>, errors: &mut Vec<String>) {
    if let Err(e) = res {
        tracing::warn!("{:#}", e);
        errors.push(format!("{:#}", e));
    }
}

/// `destination/basename(source)`; a source without a basename (`/`) maps to `root`.
pub fn target_for(source: &Path, destination: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) => destination.join(name),
        None => destination.join("root"),
    }
}

/// Sync every source into the destination, one after another.
///
/// A failing source never stops the run; each gets exactly one outcome line in
/// the summary. Errors returned from here mean the log or summary could not be
/// created at all; later write failures are recorded per source instead.
pub fn run(
    sources: &PathSet,
    destination: &ValidatedPath,
    engine: &dyn SyncEngine,
    progress: &mut dyn ProgressSink,
) -> Result<RunResult> {
    run_at(sources, destination, engine, progress, Local::now())
}

/// Same as [`run`] with an explicit start time, which names the artifacts.
pub fn run_at(
    sources: &PathSet,
    destination: &ValidatedPath,
    engine: &dyn SyncEngine,
    progress: &mut dyn ProgressSink,
    started: DateTime<Local>,
) -> Result<RunResult> {
    let dest = destination.as_path();
    let artifacts = RunArtifacts::new(dest, &started);
    let mut log = artifacts.open_log()?;
    let mut summary = artifacts.begin_summary(&started, dest, sources)?;
    let total = sources.count();
    tracing::info!(
        "run {} started: {} sources -> {}",
        artifacts.stamp,
        total,
        dest.display()
    );

    let mut records = Vec::with_capacity(total);
    for (idx, source) in sources.list().enumerate() {
        let name = display_name(source);
        progress.on_progress(idx, total, &name);

        let target = target_for(source, dest);
        let mut write_errors = Vec::new();
        let header = writeln!(
            log,
            "\n=== [{}/{}] {} -> {} ({}) ===",
            idx + 1,
            total,
            source.display(),
            target.display(),
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
        .with_context(|| format!("cannot write {}", artifacts.log_path.display()));
        keep_going(header, &mut write_errors);

        let outcome = engine.sync(source, &target, &mut log);
        match &outcome {
            Outcome::Success => tracing::info!("synced {} -> {}", source.display(), target.display()),
            Outcome::Failed { reason, .. } => {
                tracing::warn!("sync of {} failed: {}", source.display(), reason);
                let line = writeln!(log, "!!! {}", reason)
                    .with_context(|| format!("cannot write {}", artifacts.log_path.display()));
                keep_going(line, &mut write_errors);
            }
        }
        keep_going(summary.record(source, &target, &outcome), &mut write_errors);
        records.push(TransferRecord { source: source.to_path_buf(), target, outcome, write_errors });
    }
    progress.on_progress(total, total, "Done");

    let finished = Local::now();
    if let Err(e) = summary.finish(&finished) {
        tracing::warn!("{:#}", e);
    }
    let result = RunResult {
        records,
        log_path: artifacts.log_path,
        summary_path: artifacts.summary_path,
        started,
        finished,
    };
    tracing::info!(
        "run {} finished: {} ok, {} failed",
        artifacts.stamp,
        result.succeeded(),
        result.failed()
    );
    Ok(result)
}
