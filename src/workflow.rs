use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::capability::Capabilities;
use crate::config::Config;
use crate::destination::{self, ValidatedPath};
use crate::error::{AppError, ValidationError};
use crate::finder;
use crate::path_set::PathSet;
use crate::prompt::{MenuItem, Presenter, Prompt};
use crate::util::display_name;

/// How the selection menu was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Path Set is non-empty and the operator wants to continue to the destination
    Proceed,
    /// "Exit" menu item, confirmed
    Exit,
    /// Top-level menu cancelled, exit confirmed
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Browse,
    Fuzzy,
    Subfolders,
    Remove,
    View,
    Clear,
    Proceed,
    Exit,
}

const MENU: [(MenuAction, &str, &str); 8] = [
    (MenuAction::Browse, "1", "Browse folders"),
    (MenuAction::Fuzzy, "2", "Fuzzy search (fzf)"),
    (MenuAction::Subfolders, "3", "Pick subfolders of the last added folder"),
    (MenuAction::Remove, "4", "Remove folders from the selection"),
    (MenuAction::View, "5", "View selection"),
    (MenuAction::Clear, "6", "Clear selection"),
    (MenuAction::Proceed, "7", "Proceed to backup"),
    (MenuAction::Exit, "0", "Exit"),
];

/// Owns the Path Set while the operator assembles it.
pub struct SelectionWorkflow {
    paths: PathSet,
    home: PathBuf,
    /// Where manual browsing starts; follows the last picked folder
    browse_from: PathBuf,
    fzf: Option<PathBuf>,
    search_depth: usize,
    skip_hidden: bool,
}

impl SelectionWorkflow {
    pub fn new(home: &Path, config: &Config, caps: &Capabilities) -> Self {
        Self {
            paths: PathSet::new(),
            home: home.to_path_buf(),
            browse_from: home.to_path_buf(),
            fzf: caps.fzf.clone(),
            search_depth: config.search_depth.max(1),
            skip_hidden: config.skip_hidden,
        }
    }

    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut PathSet {
        &mut self.paths
    }

    /// Menu loop. Returns once the operator proceeds with a non-empty selection
    /// or confirms leaving.
    pub fn run(&mut self, ui: &mut dyn Presenter) -> Result<SelectionOutcome> {
        let items: Vec<MenuItem> = MENU.iter().map(|(_, tag, label)| (*tag, *label)).collect();
        loop {
            let text = format!(
                "{} folder(s) selected. Choose how to add folders, then proceed to the backup.",
                self.paths.count()
            );
            let action = match ui.menu("Select folders", &text, &items)? {
                Prompt::Confirmed(idx) => match MENU.get(idx) {
                    Some((action, _, _)) => *action,
                    None => continue,
                },
                Prompt::Cancelled => {
                    if ui.confirm("Exit", "Leave without backing up?")? {
                        tracing::info!("selection cancelled");
                        return Ok(SelectionOutcome::Cancelled);
                    }
                    continue;
                }
            };
            tracing::debug!("menu action {:?}", action);
            match action {
                MenuAction::Browse => self.browse(ui)?,
                MenuAction::Fuzzy => self.fuzzy_search(ui)?,
                MenuAction::Subfolders => self.pick_subfolders(ui)?,
                MenuAction::Remove => self.remove_selected(ui)?,
                MenuAction::View => self.view(ui)?,
                MenuAction::Clear => self.clear_all(ui)?,
                MenuAction::Proceed => {
                    if self.paths.is_empty() {
                        ui.message("Nothing selected", "Select at least one folder before proceeding.")?;
                        continue;
                    }
                    return Ok(SelectionOutcome::Proceed);
                }
                MenuAction::Exit => {
                    if ui.confirm("Exit", "Leave without backing up?")? {
                        return Ok(SelectionOutcome::Exit);
                    }
                }
            }
        }
    }

    /// Manual navigation. Loops until the picker is cancelled or the operator
    /// stops.
    pub fn browse(&mut self, ui: &mut dyn Presenter) -> Result<()> {
        loop {
            let picked = match ui.pick_directory("Browse folders", &self.browse_from)? {
                Prompt::Confirmed(p) => p,
                Prompt::Cancelled => return Ok(()),
            };
            if !picked.is_dir() {
                ui.message(
                    "Invalid folder",
                    &format!("{} does not exist or is not a folder.", picked.display()),
                )?;
                continue;
            }

            let status = if self.paths.add(&picked) {
                tracing::info!("added {}", picked.display());
                format!("Added {}", picked.display())
            } else {
                ui.message("Already selected", &format!("{} is already in the selection.", picked.display()))?;
                format!("{} was already selected", picked.display())
            };

            if ui.confirm("Preview", &format!("{}.\n\nShow the contents of this folder?", status))? {
                match finder::describe_contents(&picked) {
                    Ok(listing) => ui.show_text(&display_name(&picked), &listing)?,
                    Err(e) => ui.message("Preview failed", &format!("{:#}", e))?,
                }
            }

            if !ui.confirm(
                "Continue",
                &format!("Select another folder?\nBrowsing continues from {}", picked.display()),
            )? {
                return Ok(());
            }
            self.browse_from = picked;
        }
    }

    /// Multi-select through the external fuzzy matcher. A missing matcher or an
    /// empty selection leaves the Path Set untouched.
    pub fn fuzzy_search(&mut self, ui: &mut dyn Presenter) -> Result<()> {
        let Some(fzf) = self.fzf.clone() else {
            ui.message(
                "Fuzzy search unavailable",
                "fzf was not found. Install it or set fzf_path in ~/.picksync/config.json.",
            )?;
            return Ok(());
        };

        let base = self.home.clone();
        let (depth, skip_hidden) = (self.search_depth, self.skip_hidden);
        let mut picked: Vec<PathBuf> = Vec::new();
        let mut scanned = 0usize;
        let released = ui.release_terminal(&mut || {
            let candidates = finder::directory_candidates_with_spinner(&base, depth, skip_hidden);
            scanned = candidates.len();
            if candidates.is_empty() {
                return Ok(());
            }
            picked = finder::pick_with_fzf(&fzf, &candidates)?;
            Ok(())
        });
        if let Err(e) = released {
            tracing::warn!("fuzzy search failed: {:#}", e);
            ui.message("Fuzzy search failed", &format!("{:#}", e))?;
            return Ok(());
        }
        tracing::debug!("{} candidates offered, {} picked", scanned, picked.len());

        if scanned == 0 {
            ui.message("Fuzzy search", &format!("No folders found below {}.", base.display()))?;
            return Ok(());
        }
        if picked.is_empty() {
            ui.message("Fuzzy search", "Nothing selected.")?;
            return Ok(());
        }

        let mut added = 0;
        let mut skipped = 0;
        for path in &picked {
            if path.is_dir() && self.paths.add(path) {
                added += 1;
            } else {
                skipped += 1;
            }
        }
        tracing::info!("fuzzy search added {} folder(s)", added);
        let mut text = format!("Added {} folder(s).", added);
        if skipped > 0 {
            text.push_str(&format!("\n{} already selected or no longer present.", skipped));
        }
        ui.message("Fuzzy search", &text)
    }

    /// Checklist of the immediate children of the last added folder (or home).
    pub fn pick_subfolders(&mut self, ui: &mut dyn Presenter) -> Result<()> {
        let parent = self
            .paths
            .last()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.home.clone());
        let subs = finder::subdirectories(&parent);
        if subs.is_empty() {
            return ui.message("Subfolders", &format!("{} has no subfolders.", parent.display()));
        }

        let labels: Vec<String> = subs
            .iter()
            .map(|p| {
                let name = display_name(p);
                if self.paths.contains(p) { format!("{} (selected)", name) } else { name }
            })
            .collect();
        let checked = match ui.checklist(
            "Subfolders",
            &format!("Subfolders of {}", parent.display()),
            &labels,
        )? {
            Prompt::Confirmed(idx) => idx,
            Prompt::Cancelled => return Ok(()),
        };

        let added = checked
            .iter()
            .filter_map(|i| subs.get(*i))
            .filter(|p| self.paths.add(p))
            .count();
        tracing::info!("added {} subfolder(s) of {}", added, parent.display());
        ui.message("Subfolders", &format!("Added {} folder(s).", added))
    }

    pub fn remove_selected(&mut self, ui: &mut dyn Presenter) -> Result<()> {
        if self.paths.is_empty() {
            return ui.message("Remove folders", "The selection is empty.");
        }
        let current: Vec<PathBuf> = self.paths.list().map(Path::to_path_buf).collect();
        let labels: Vec<String> = current.iter().map(|p| p.display().to_string()).collect();
        let checked = match ui.checklist("Remove folders", "Check the folders to remove", &labels)? {
            Prompt::Confirmed(idx) => idx,
            Prompt::Cancelled => return Ok(()),
        };
        let removed = self.paths.remove_all(checked.iter().filter_map(|i| current.get(*i)));
        tracing::info!("removed {} folder(s)", removed);
        ui.message("Remove folders", &format!("Removed {} folder(s).", removed))
    }

    pub fn view(&mut self, ui: &mut dyn Presenter) -> Result<()> {
        if self.paths.is_empty() {
            return ui.message("Selection", "No folders selected yet.");
        }
        ui.show_text("Selection", &selection_listing(&self.paths))
    }

    pub fn clear_all(&mut self, ui: &mut dyn Presenter) -> Result<()> {
        if self.paths.is_empty() {
            return ui.message("Clear selection", "The selection is already empty.");
        }
        let question = format!("Remove all {} folder(s) from the selection?", self.paths.count());
        if ui.confirm("Clear selection", &question)? {
            self.paths.clear();
            tracing::info!("selection cleared");
        }
        Ok(())
    }
}

/// Numbered list of the selection followed by the total.
pub fn selection_listing(paths: &PathSet) -> String {
    let mut out = String::new();
    for (idx, path) in paths.list().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", idx + 1, path.display()));
    }
    out.push_str(&format!("\nTotal: {} folder(s)\n", paths.count()));
    out
}

/// Ask for the destination until it validates. Cancelling the input box is the
/// only way out without a destination.
pub fn choose_destination(ui: &mut dyn Presenter, home: &Path, hint: &Path) -> Result<ValidatedPath> {
    let mut default = hint.display().to_string();
    loop {
        let raw = match ui.input("Destination", "Backup destination folder:", &default)? {
            Prompt::Confirmed(s) => s,
            Prompt::Cancelled => return Err(AppError::UserCancelled.into()),
        };
        default = raw.clone();

        let mut prompt_failure = None;
        let checked = destination::validate(&raw, home, |path| {
            let question = format!("{} does not exist.\n\nCreate it?", path.display());
            match ui.confirm("Create folder", &question) {
                Ok(yes) => yes,
                Err(e) => {
                    prompt_failure = Some(e);
                    false
                }
            }
        });
        if let Some(e) = prompt_failure {
            return Err(e);
        }

        match checked {
            Ok(dest) => {
                tracing::info!("destination {}", dest);
                return Ok(dest);
            }
            Err(ValidationError::CreationDeclined(p)) => {
                tracing::debug!("creation of {} declined", p.display());
            }
            Err(e) => {
                tracing::info!("destination rejected: {}", e);
                ui.message("Invalid destination", &e.to_string())?;
            }
        }
    }
}

/// Final yes/no before anything is written to the destination.
pub fn confirm_transfer(ui: &mut dyn Presenter, paths: &PathSet, dest: &ValidatedPath) -> Result<bool> {
    let mut text = format!(
        "Back up {} folder(s) to\n{}\n\nFiles missing from a source are deleted from its copy.",
        paths.count(),
        dest
    );
    let nested: Vec<&Path> = paths.list().filter(|p| dest.as_path().starts_with(p)).collect();
    for p in nested {
        text.push_str(&format!("\nWarning: the destination lies inside {}", p.display()));
    }
    text.push_str("\n\nStart now?");
    ui.confirm("Start backup", &text)
}
