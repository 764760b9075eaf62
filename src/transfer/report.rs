use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use super::Outcome;
use crate::path_set::PathSet;

const FILE_STAMP: &str = "%Y%m%d_%H%M%S";
const HUMAN_STAMP: &str = "%Y-%m-%d %H:%M:%S";
const RULE: &str = "==========================================";

/// Names of the two files one run leaves under the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub stamp: String,
    pub log_path: PathBuf,
    pub summary_path: PathBuf,
}

impl RunArtifacts {
    pub fn new(destination: &Path, started: &DateTime<Local>) -> Self {
        let stamp = started.format(FILE_STAMP).to_string();
        Self {
            log_path: destination.join(format!("backup_{}.log", stamp)),
            summary_path: destination.join(format!("backup_summary_{}.txt", stamp)),
            stamp,
        }
    }

    pub fn open_log(&self) -> Result<File> {
        append(&self.log_path)
    }

    /// Create the summary and write the header before any transfer starts.
    pub fn begin_summary(
        &self,
        started: &DateTime<Local>,
        destination: &Path,
        sources: &PathSet,
    ) -> Result<SummaryWriter> {
        let mut file = append(&self.summary_path)?;
        let log_name = self
            .log_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut header = String::new();
        header.push_str(RULE);
        header.push_str("\nBackup Summary\n");
        header.push_str(RULE);
        header.push('\n');
        header.push_str(&format!("Started:     {}\n", started.format(HUMAN_STAMP)));
        header.push_str(&format!("Destination: {}\n", destination.display()));
        header.push_str(&format!("Sources:     {}\n", sources.count()));
        for (idx, source) in sources.list().enumerate() {
            header.push_str(&format!("  {:>3}. {}\n", idx + 1, source.display()));
        }
        header.push_str(&format!("Log file:    {}\n", log_name));
        header.push_str(RULE);
        header.push_str("\n\n");
        file.write_all(header.as_bytes())
            .with_context(|| format!("cannot write {}", self.summary_path.display()))?;
        Ok(SummaryWriter { file, path: self.summary_path.clone() })
    }
}

/// Appends outcome lines to an open summary file.
pub struct SummaryWriter {
    file: File,
    path: PathBuf,
}

impl SummaryWriter {
    pub fn record(&mut self, source: &Path, target: &Path, outcome: &Outcome) -> Result<()> {
        writeln!(self.file, "{}", outcome_line(source, target, outcome))
            .with_context(|| format!("cannot write {}", self.path.display()))
    }

    pub fn finish(mut self, finished: &DateTime<Local>) -> Result<()> {
        writeln!(self.file, "\nCompleted:   {}", finished.format(HUMAN_STAMP))
            .with_context(|| format!("cannot write {}", self.path.display()))
    }
}

pub fn outcome_line(source: &Path, target: &Path, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success => format!("[OK]     {} -> {}", source.display(), target.display()),
        Outcome::Failed { code: Some(c), .. } => format!(
            "[FAILED] {} -> {} (exit {})",
            source.display(),
            target.display(),
            c
        ),
        Outcome::Failed { code: None, .. } => {
            format!("[FAILED] {} -> {}", source.display(), target.display())
        }
    }
}

fn append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))
}
