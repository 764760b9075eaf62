use anyhow::Result;
use cli_table::{Cell, CellStruct, Color, Style, Table, format::Justify, print_stdout};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use crate::transfer::{Outcome, RunResult};

/// Try to enable ANSI escape sequence support on Windows consoles.
/// Returns true if enabling succeeded (or platform likely already supports ANSI), false otherwise.
#[cfg(windows)]
pub fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

// ANSI works out of the box in unix terminals; no-op so callers need no cfg.
#[cfg(not(windows))]
pub fn try_enable_ansi_on_windows() -> bool {
    true
}

/// Strip exactly one trailing path separator. A lone root separator is kept.
pub fn strip_trailing_separator(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if s.len() > 1 && s.chars().last().is_some_and(std::path::is_separator) => {
            let last = s.chars().last().map(char::len_utf8).unwrap_or(1);
            PathBuf::from(&s[..s.len() - last])
        }
        _ => path.to_path_buf(),
    }
}

/// Expand a leading `~` (alone or followed by a separator) to `home`.
pub fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

/// Last path segment for display, falling back to the whole path (e.g. `/`).
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print the per-source outcome table after the terminal has been restored.
pub fn print_run_table(result: &RunResult) -> Result<()> {
    let colored = try_enable_ansi_on_windows();
    let title = vec![
        "#".cell().bold(true),
        "Source".cell().bold(true),
        "Destination".cell().bold(true),
        "Status".cell().bold(true),
    ];
    let mut table: Vec<Vec<CellStruct>> = Vec::new();
    for (idx, record) in result.records.iter().enumerate() {
        let status = match record.outcome {
            Outcome::Success => "OK".cell().foreground_color(Some(Color::Green)),
            Outcome::Failed { .. } => "FAILED".cell().foreground_color(Some(Color::Red)),
        };
        table.push(vec![
            (idx + 1).cell().justify(Justify::Right),
            record.source.display().to_string().cell(),
            record.target.display().to_string().cell(),
            status,
        ]);
    }
    print_stdout(table.table().title(title))?;

    let totals = format!(
        "{} succeeded, {} failed",
        result.succeeded(),
        result.failed()
    );
    if colored && result.failed() > 0 {
        println!("{}", totals.yellow());
    } else if colored {
        println!("{}", totals.green());
    } else {
        println!("{}", totals);
    }
    println!("Summary: {}", result.summary_path.display());
    println!("Log:     {}", result.log_path.display());
    Ok(())
}
