use std::path::PathBuf;
use thiserror::Error;

/// Error types for pickup operations
#[derive(Error, Debug)]
pub enum PickupError {
    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigurationNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {reason}")]
    ConfigurationParseError { reason: String },

    #[error("Invalid job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    // File system errors
    #[error("Source path for job '{job}' does not exist: {path}")]
    SourceNotFound { job: String, path: PathBuf },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Filesystem error on path {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Checkpoint errors
    #[error("Failed to load checkpoints from {path}: {reason}")]
    CheckpointLoadFailed { path: PathBuf, reason: String },

    #[error("Failed to save checkpoints to {path}: {reason}")]
    CheckpointSaveFailed { path: PathBuf, reason: String },

    // External tool errors
    #[error("Archiver '{program}' failed: {reason}")]
    ArchiverFailed { program: String, reason: String },
}

impl PickupError {
    /// How far this error propagates through a run
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PickupError::ConfigurationNotFound { .. }
            | PickupError::ConfigurationParseError { .. } => ErrorSeverity::Fatal,
            PickupError::InvalidJob { .. }
            | PickupError::SourceNotFound { .. }
            | PickupError::ArchiverFailed { .. } => ErrorSeverity::JobSkip,
            PickupError::FileNotFound { .. } | PickupError::Filesystem { .. } => {
                ErrorSeverity::EntrySkip
            }
            PickupError::CheckpointLoadFailed { .. } | PickupError::CheckpointSaveFailed { .. } => {
                ErrorSeverity::JobSkip
            }
        }
    }

    /// Convert to exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Fatal => 1,
            ErrorSeverity::JobSkip | ErrorSeverity::EntrySkip => 0,
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PickupError::FileNotFound { path }
        } else {
            PickupError::Filesystem { path, source }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Aborts the whole run
    Fatal,
    /// Skips the current job, the run continues
    JobSkip,
    /// Skips one file within a job
    EntrySkip,
}

/// Result type alias for pickup operations
pub type PickupResult<T> = Result<T, PickupError>;
