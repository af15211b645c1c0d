//! Rotation fault taxonomy

use std::path::{Path, PathBuf};

/// Stage of the rotation pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationErrorKind {
    /// Empty path or null device; never retried
    InvalidTarget,
    StatFailure,
    ReadFailure,
    WriteFailure,
    CompressFailure,
    /// Archive exists but the source kept its content
    TruncateFailure,
    DirectoryListFailure,
    DeleteFailure,
}

impl RotationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationErrorKind::InvalidTarget => "invalid_target",
            RotationErrorKind::StatFailure => "stat_failure",
            RotationErrorKind::ReadFailure => "read_failure",
            RotationErrorKind::WriteFailure => "write_failure",
            RotationErrorKind::CompressFailure => "compress_failure",
            RotationErrorKind::TruncateFailure => "truncate_failure",
            RotationErrorKind::DirectoryListFailure => "directory_list_failure",
            RotationErrorKind::DeleteFailure => "delete_failure",
        }
    }
}

impl std::fmt::Display for RotationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rotation fault, carrying the path it happened on
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} on {}: {message}", path.display())]
pub struct RotationError {
    pub kind: RotationErrorKind,
    pub path: PathBuf,
    pub message: String,
}

/// Result type alias for rotation operations
pub type Result<T> = std::result::Result<T, RotationError>;

impl RotationError {
    pub fn new(kind: RotationErrorKind, path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn io(kind: RotationErrorKind, path: &Path, err: &std::io::Error) -> Self {
        Self::new(kind, path, err.to_string())
    }

    pub fn invalid_target(path: &Path) -> Self {
        Self::new(RotationErrorKind::InvalidTarget, path, "not a rotatable log file")
    }
}
