use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ValidationError;
use crate::util::{expand_tilde, strip_trailing_separator};

/// A destination that exists, is a directory, and accepted a probe write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath(PathBuf);

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_inner(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Check one destination candidate.
///
/// `confirm_create` is asked before a missing directory (and its parents) is
/// created. The function never loops; callers re-prompt on error.
pub fn validate<F>(raw: &str, home: &Path, mut confirm_create: F) -> Result<ValidatedPath, ValidationError>
where
    F: FnMut(&Path) -> bool,
{
    if raw.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    let path = resolve(&strip_trailing_separator(Path::new(raw)), home);

    if !path.is_dir() {
        if !confirm_create(&path) {
            return Err(ValidationError::CreationDeclined(path));
        }
        std::fs::create_dir_all(&path).map_err(|e| ValidationError::CreateFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        tracing::info!("created destination {}", path.display());
    }

    if !is_writable(&path) {
        return Err(ValidationError::NotWritable(path));
    }
    Ok(ValidatedPath(path))
}

// `~` expansion plus absolutizing against the working directory
fn resolve(path: &Path, home: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some(s) => expand_tilde(s, home),
        None => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        return expanded;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(expanded),
        Err(e) => {
            tracing::warn!("cannot read working directory: {}", e);
            expanded
        }
    }
}

/// Writability is decided by creating and removing a probe file, which also
/// covers ACLs and read-only mounts that permission bits do not show.
pub fn is_writable(dir: &Path) -> bool {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let probe = dir.join(format!(".picksync-probe-{}-{}", std::process::id(), nanos));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(file) => {
            drop(file);
            if let Err(e) = std::fs::remove_file(&probe) {
                tracing::warn!("cannot remove probe file {}: {}", probe.display(), e);
            }
            true
        }
        Err(e) => {
            tracing::debug!("write probe in {} failed: {}", dir.display(), e);
            false
        }
    }
}
