use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_FILE_NAME: &str = "picksync.log";

/// Route diagnostics to `<app_dir>/logs/picksync.log`; the terminal belongs to the TUI.
///
/// The returned guard flushes the writer on drop and must outlive the session.
/// Verbosity follows `RUST_LOG` (default `info`).
pub fn init_file_logging(app_dir: &Path) -> Result<(WorkerGuard, PathBuf)> {
    let log_dir = app_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    let appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok((guard, log_path))
}
