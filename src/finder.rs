use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

/// Directories below `base`, down to `max_depth` levels, in walk order, with a
/// spinner on stderr while walking. Unreadable directories are skipped.
/// Meant for when the terminal has been released to plain output.
pub fn directory_candidates_with_spinner(base: &Path, max_depth: usize, skip_hidden: bool) -> Vec<PathBuf> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Scanning {} ...", base.display()));
    let found = scan(base, max_depth, skip_hidden, |count| {
        if count % 200 == 0 {
            spinner.set_message(format!("Scanning {} ... {} folders", base.display(), count));
            spinner.tick();
        }
    });
    spinner.finish_and_clear();
    found
}

fn scan<F: FnMut(usize)>(base: &Path, max_depth: usize, skip_hidden: bool, mut on_found: F) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let walker = WalkDir::new(base)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(skip_hidden && is_hidden(e)));
    for entry in walker {
        match entry {
            Ok(e) if e.file_type().is_dir() => {
                found.push(e.into_path());
                on_found(found.len());
            }
            Ok(_) => {}
            Err(err) => tracing::debug!("skipping unreadable entry: {}", err),
        }
    }
    found
}

/// Immediate child directories of `parent`, sorted by name. Symlinks are not followed.
pub fn subdirectories(parent: &Path) -> Vec<PathBuf> {
    scan(parent, 1, false, |_| {})
}

/// Run the fuzzy matcher in multi-select mode over `candidates`.
///
/// An empty result means the operator cancelled (or nothing matched).
pub fn pick_with_fzf(program: &Path, candidates: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut child = Command::new(program)
        .args([
            "--multi",
            "--prompt",
            "folders> ",
            "--header",
            "TAB: mark   ENTER: accept   ESC: cancel",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("cannot start {}", program.display()))?;

    if let Some(mut stdin) = child.stdin.take() {
        for candidate in candidates {
            let line = format!("{}\n", candidate.display());
            if let Err(e) = stdin.write_all(line.as_bytes()) {
                // the matcher stops reading once the operator accepts or cancels
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    tracing::warn!("writing candidates to {} failed: {}", program.display(), e);
                }
                break;
            }
        }
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("waiting for {} failed", program.display()))?;
    tracing::debug!("{} exited with {:?}", program.display(), output.status.code());
    Ok(parse_selection(&String::from_utf8_lossy(&output.stdout)))
}

/// One path per non-empty line.
pub fn parse_selection(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Short listing of a directory for the preview box: folders first, then files.
pub fn describe_contents(dir: &Path) -> Result<String> {
    let mut entries: Vec<(bool, String, u64)> = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let entry = entry?;
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("no metadata for {}: {}", entry.path().display(), e);
                continue;
            }
        };
        entries.push((meta.is_dir(), entry.file_name().to_string_lossy().to_string(), meta.len()));
    }
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut out = format!("{}\n{} entries\n\n", dir.display(), entries.len());
    for (is_dir, name, len) in entries {
        if is_dir {
            out.push_str(&format!("  {}/\n", name));
        } else {
            out.push_str(&format!("  {:<40} {:>10}\n", name, human_bytes(len)));
        }
    }
    Ok(out)
}

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parsing_drops_blank_lines() {
        let out = "/home/op/a\n\n/home/op/b c\r\n   \n";
        assert_eq!(
            parse_selection(out),
            vec![PathBuf::from("/home/op/a"), PathBuf::from("/home/op/b c")]
        );
        assert!(parse_selection("").is_empty());
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(12), "12 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MiB");
    }
}
