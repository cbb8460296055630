//! Error types for dirmirror

use std::path::PathBuf;
use thiserror::Error;

/// Error types for mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Source root vanished between startup and a pass
    #[error("Source directory does not exist: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// Directory traversal failed at the root
    #[error("Failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be opened or read while computing its digest
    #[error("Failed to hash {}: {source}", path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copy of a single file failed
    #[error("Failed to copy {} to {}: {source}", src.display(), dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Removal of a single replica entry failed
    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Permission denied for specific path
    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    /// Hash worker pool failure (task panic, closed channel)
    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl MirrorError {
    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, MirrorError::Validation(_) | MirrorError::Config(_))
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        match self {
            MirrorError::PermissionDenied { .. } => true,
            MirrorError::Io(e)
            | MirrorError::Scan { source: e, .. }
            | MirrorError::Hash { source: e, .. }
            | MirrorError::Copy { source: e, .. }
            | MirrorError::Remove { source: e, .. } => {
                e.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Whether this error aborts a whole pass.
    ///
    /// Copy and remove failures are isolated per file; everything else means
    /// the pass cannot safely decide what to do.
    pub fn is_pass_fatal(&self) -> bool {
        !matches!(self, MirrorError::Copy { .. } | MirrorError::Remove { .. })
    }
}
