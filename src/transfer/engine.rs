use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::Outcome;

/// Mirrors one source directory into one target directory.
///
/// Implementations append their own diagnostics to `log`; the exit status is the
/// only thing the orchestrator interprets.
pub trait SyncEngine {
    fn sync(&self, source: &Path, target: &Path, log: &mut File) -> Outcome;
}

/// `rsync` in archive mode with delete-mirroring and exclude patterns.
#[derive(Debug, Clone)]
pub struct RsyncEngine {
    program: PathBuf,
    excludes: Vec<String>,
}

impl RsyncEngine {
    pub fn new(program: impl Into<PathBuf>, excludes: Vec<String>) -> Self {
        Self { program: program.into(), excludes }
    }

    /// Arguments for one invocation. The source gets a trailing `/` so its
    /// contents land directly inside `target`.
    pub fn args(&self, source: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> =
            ["-a", "-v", "-h", "--delete", "--stats"].iter().map(OsString::from).collect();
        for pattern in &self.excludes {
            args.push(OsString::from(format!("--exclude={}", pattern)));
        }
        let mut src = source.as_os_str().to_os_string();
        if !source.to_string_lossy().ends_with('/') {
            src.push("/");
        }
        args.push(src);
        args.push(target.as_os_str().to_os_string());
        args
    }
}

impl SyncEngine for RsyncEngine {
    fn sync(&self, source: &Path, target: &Path, log: &mut File) -> Outcome {
        let (out, err) = match (log.try_clone(), log.try_clone()) {
            (Ok(o), Ok(e)) => (o, e),
            (Err(e), _) | (_, Err(e)) => {
                return Outcome::Failed {
                    code: None,
                    reason: format!("cannot hand log file to {}: {}", self.program.display(), e),
                };
            }
        };
        let status = Command::new(&self.program)
            .args(self.args(source, target))
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .status();
        match status {
            Ok(s) if s.success() => Outcome::Success,
            Ok(s) => Outcome::Failed {
                code: s.code(),
                reason: match s.code() {
                    Some(c) => format!("{} exited with status {}", self.program.display(), c),
                    None => format!("{} was terminated by a signal", self.program.display()),
                },
            },
            Err(e) => {
                tracing::error!("cannot start {}: {}", self.program.display(), e);
                Outcome::Failed {
                    code: None,
                    reason: format!("cannot start {}: {}", self.program.display(), e),
                }
            }
        }
    }
}
