use std::path::PathBuf;

/// Exit code for a normal run or a graceful exit from the menu.
pub const EXIT_OK: i32 = 0;
/// Exit code when a required external capability is absent.
pub const EXIT_MISSING_CAPABILITY: i32 = 1;
/// Exit code when the operator cancels the run.
pub const EXIT_CANCELLED: i32 = 2;
/// Exit code for anything else that aborts the session (terminal I/O, artifacts
/// that cannot be created). Kept apart from the engine's own statuses.
pub const EXIT_FAILURE: i32 = 70;

/// Reasons a destination path was rejected by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing was entered
    EmptyPath,
    /// The directory did not exist and the operator chose not to create it.
    /// Callers re-prompt without showing an error.
    CreationDeclined(PathBuf),
    /// Creating the directory (or one of its parents) failed
    CreateFailed { path: PathBuf, reason: String },
    /// The directory exists but the current user cannot write into it
    NotWritable(PathBuf),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyPath => write!(f, "Destination path cannot be empty"),
            ValidationError::CreationDeclined(p) => {
                write!(f, "Destination was not created: {}", p.display())
            }
            ValidationError::CreateFailed { path, reason } => {
                write!(f, "Failed to create destination {}: {}", path.display(), reason)
            }
            ValidationError::NotWritable(p) => {
                write!(f, "Destination is not writable by the current user: {}", p.display())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors that end (or short-circuit) the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required external tool is not available; fatal before any interaction.
    MissingCapability { name: String, hint: String },
    /// The operator backed out of a prompt that has no parent to return to.
    UserCancelled,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::MissingCapability { name, hint } => {
                write!(f, "Required tool '{}' is not available: {}", name, hint)
            }
            AppError::UserCancelled => write!(f, "Cancelled by user"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::MissingCapability { .. } => EXIT_MISSING_CAPABILITY,
            AppError::UserCancelled => EXIT_CANCELLED,
        }
    }
}

/// Map an error bubbling out of the session to the process exit code.
/// Anything that is not an `AppError` is an unexpected failure.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(app) => app.exit_code(),
        None => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let missing = AppError::MissingCapability { name: "rsync".into(), hint: "install it".into() };
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(AppError::UserCancelled.exit_code(), 2);

        let wrapped: anyhow::Error = AppError::UserCancelled.into();
        assert_eq!(exit_code_for(&wrapped), 2);
        let other = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&other), EXIT_FAILURE);
    }

    #[test]
    fn context_keeps_app_error_reachable() {
        use anyhow::Context;
        let res: anyhow::Result<()> = Err(AppError::UserCancelled.into());
        let err = res.context("choosing destination").unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn aborted_run_is_not_a_missing_capability() {
        use anyhow::Context;
        let io = std::io::Error::new(std::io::ErrorKind::StorageFull, "No space left on device");
        let res: anyhow::Result<()> = Err(io).context("cannot open /backup/backup_20240309_070501.log");
        let err = res.unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
        assert_ne!(exit_code_for(&err), EXIT_MISSING_CAPABILITY);
    }
}
