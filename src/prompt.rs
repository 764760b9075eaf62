//! Toolkit-agnostic dialog interface used by the selection workflow and the
//! transfer orchestrator. `crate::tui` renders it with ratatui; tests drive it
//! with a scripted double.

use std::path::{Path, PathBuf};

use anyhow::Result;

/// Outcome of any prompt the operator can back out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt<T> {
    Confirmed(T),
    Cancelled,
}

/// One entry of a single-choice menu: short tag plus description.
pub type MenuItem<'a> = (&'a str, &'a str);

pub trait Presenter {
    /// Informational box, dismissed by any key.
    fn message(&mut self, title: &str, text: &str) -> Result<()>;

    /// Yes/no question. Backing out counts as "no".
    fn confirm(&mut self, title: &str, question: &str) -> Result<bool>;

    /// Single choice; returns the index into `items`.
    fn menu(&mut self, title: &str, text: &str, items: &[MenuItem<'_>]) -> Result<Prompt<usize>>;

    /// Free text input pre-filled with `default`.
    fn input(&mut self, title: &str, text: &str, default: &str) -> Result<Prompt<String>>;

    /// Multi-check list, every item unchecked initially. Returns checked indices in
    /// ascending order.
    fn checklist(&mut self, title: &str, text: &str, items: &[String]) -> Result<Prompt<Vec<usize>>>;

    /// Read-only scrollable text.
    fn show_text(&mut self, title: &str, body: &str) -> Result<()>;

    /// Directory browser starting at `start`.
    fn pick_directory(&mut self, title: &str, start: &Path) -> Result<Prompt<PathBuf>>;

    /// Draw the progress gauge without waiting for input.
    fn progress(&mut self, title: &str, percent: u16, status: &str) -> Result<()>;

    /// Hand the terminal to an interactive child process for the duration of `task`.
    fn release_terminal(&mut self, task: &mut dyn FnMut() -> Result<()>) -> Result<()>;

    /// Drop input typed while nothing was waiting for it (e.g. during a transfer).
    fn discard_pending_input(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Receiver of per-item transfer progress.
pub trait ProgressSink {
    fn on_progress(&mut self, current: usize, total: usize, label: &str);
}

/// Feeds `ProgressSink` events into a presenter's gauge.
pub struct GaugeProgress<'a, P: Presenter + ?Sized> {
    presenter: &'a mut P,
    title: String,
}

impl<'a, P: Presenter + ?Sized> GaugeProgress<'a, P> {
    pub fn new(presenter: &'a mut P, title: impl Into<String>) -> Self {
        Self { presenter, title: title.into() }
    }
}

impl<P: Presenter + ?Sized> ProgressSink for GaugeProgress<'_, P> {
    fn on_progress(&mut self, current: usize, total: usize, label: &str) {
        let status = format!("[{}/{}] {}", current.min(total), total, label);
        if let Err(e) = self.presenter.progress(&self.title, percent(current, total), &status) {
            tracing::warn!("progress redraw failed: {:#}", e);
        }
    }
}

/// Completed share as a whole percentage; an empty run counts as finished.
pub fn percent(current: usize, total: usize) -> u16 {
    if total == 0 {
        return 100;
    }
    ((current.min(total) * 100) / total) as u16
}
