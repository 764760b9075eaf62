use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::capability::Capabilities;
use crate::config::Config;
use crate::error::{AppError, EXIT_OK};
use crate::prompt::{GaugeProgress, Presenter};
use crate::transfer::{self, RsyncEngine, RunResult, SyncEngine, outcome_line};
use crate::workflow::{self, SelectionOutcome, SelectionWorkflow};

/// Only the tail of a large engine log is shown in the viewer.
const LOG_VIEW_LIMIT: u64 = 256 * 1024;

/// How an interactive session ended without an error.
#[derive(Debug)]
pub enum Session {
    Finished(RunResult),
    Exited,
}

impl Session {
    /// 0 unless a source failed, in which case the last failure's status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Session::Finished(result) => result.last_failure_code().unwrap_or(EXIT_OK),
            Session::Exited => EXIT_OK,
        }
    }
}

pub struct App {
    home: PathBuf,
    config: Config,
    caps: Capabilities,
    workflow: SelectionWorkflow,
    last_destination: Option<PathBuf>,
}

impl App {
    pub fn init(home: PathBuf, config: Config, caps: Capabilities) -> Self {
        let workflow = SelectionWorkflow::new(&home, &config, &caps);
        Self { home, config, caps, workflow, last_destination: None }
    }

    pub fn workflow_mut(&mut self) -> &mut SelectionWorkflow {
        &mut self.workflow
    }

    /// Full session with the configured rsync.
    pub fn run(&mut self, ui: &mut dyn Presenter) -> Result<Session> {
        let engine = RsyncEngine::new(self.caps.rsync.clone(), self.config.excludes.clone());
        self.run_with(ui, &engine)
    }

    /// selection -> destination -> confirmation -> transfer -> report.
    /// Declining the confirmation goes back to the selection menu.
    pub fn run_with(&mut self, ui: &mut dyn Presenter, engine: &dyn SyncEngine) -> Result<Session> {
        loop {
            match self.workflow.run(ui)? {
                SelectionOutcome::Proceed => {}
                SelectionOutcome::Exit => return Ok(Session::Exited),
                SelectionOutcome::Cancelled => return Err(AppError::UserCancelled.into()),
            }

            let hint = self
                .last_destination
                .clone()
                .unwrap_or_else(|| self.config.destination_hint(&self.home));
            let dest = workflow::choose_destination(ui, &self.home, &hint)?;
            self.last_destination = Some(dest.as_path().to_path_buf());

            if !workflow::confirm_transfer(ui, self.workflow.paths(), &dest)? {
                tracing::info!("transfer to {} declined", dest);
                continue;
            }

            let result = {
                let mut gauge = GaugeProgress::new(&mut *ui, "Backing up");
                transfer::run(self.workflow.paths(), &dest, engine, &mut gauge)?
            };
            ui.discard_pending_input()?;
            report(ui, &result)?;
            return Ok(Session::Finished(result));
        }
    }
}

fn report(ui: &mut dyn Presenter, result: &RunResult) -> Result<()> {
    let mut summary = match std::fs::read_to_string(&result.summary_path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("cannot read {}: {}", result.summary_path.display(), e);
            let mut text = format!("Summary file {} is unreadable: {}\n\n", result.summary_path.display(), e);
            for record in &result.records {
                text.push_str(&outcome_line(&record.source, &record.target, &record.outcome));
                text.push('\n');
            }
            text
        }
    };
    if result.with_write_errors() > 0 {
        summary.push_str(&format!(
            "\nWarning: log or summary output was lost for {} source(s):\n",
            result.with_write_errors()
        ));
        for err in result.records.iter().flat_map(|r| r.write_errors.iter()) {
            summary.push_str(&format!("  {}\n", err));
        }
    }
    let title = if result.failed() == 0 {
        "Backup complete".to_string()
    } else {
        format!("Backup finished with {} failure(s)", result.failed())
    };
    ui.show_text(&title, &summary)?;

    if ui.confirm("Detailed log", "View the detailed transfer log?")? {
        match read_tail(&result.log_path, LOG_VIEW_LIMIT) {
            Ok(text) => ui.show_text("Transfer log", &text)?,
            Err(e) => ui.message("Transfer log", &format!("{:#}", e))?,
        }
    }
    Ok(())
}

/// Whole file when small, otherwise the last `limit` bytes starting at a line boundary.
pub fn read_tail(path: &Path, limit: u64) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let len = file.metadata()?.len();
    if len <= limit {
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        return Ok(String::from_utf8_lossy(&raw).into_owned());
    }
    file.seek(SeekFrom::Start(len - limit))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;
    let start = raw.iter().position(|b| *b == b'\n').map(|i| i + 1).unwrap_or(0);
    Ok(format!(
        "... ({} earlier bytes omitted, full log: {})\n{}",
        len - limit + start as u64,
        path.display(),
        String::from_utf8_lossy(&raw[start..])
    ))
}
