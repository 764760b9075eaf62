use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::AppError;

/// External tools resolved once at startup.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Sync engine, required
    pub rsync: PathBuf,
    /// Fuzzy matcher, optional; the fuzzy action reports its absence
    pub fzf: Option<PathBuf>,
}

impl Capabilities {
    /// Resolve the configured tools and make sure an interactive terminal is attached.
    pub fn probe(config: &Config) -> Result<Self, AppError> {
        if !(std::io::stdin().is_terminal() && std::io::stdout().is_terminal()) {
            return Err(AppError::MissingCapability {
                name: "terminal".to_string(),
                hint: "run picksync from an interactive terminal".to_string(),
            });
        }
        Self::resolve(config)
    }

    /// Tool lookup without the terminal check.
    pub fn resolve(config: &Config) -> Result<Self, AppError> {
        let rsync = locate(&config.rsync_path).ok_or_else(|| AppError::MissingCapability {
            name: config.rsync_path.display().to_string(),
            hint: "install rsync or set rsync_path in ~/.picksync/config.json".to_string(),
        })?;
        let fzf = locate(&config.fzf_path);
        match &fzf {
            Some(p) => tracing::info!("fuzzy matcher: {}", p.display()),
            None => tracing::info!("fuzzy matcher {} not found", config.fzf_path.display()),
        }
        tracing::info!("sync engine: {}", rsync.display());
        Ok(Self { rsync, fzf })
    }
}

fn locate(program: &Path) -> Option<PathBuf> {
    match which::which(program) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::debug!("lookup of {} failed: {}", program.display(), e);
            None
        }
    }
}
