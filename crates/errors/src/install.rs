//! Installation system error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstallError {
    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("atomic operation failed: {message}")]
    AtomicOperationFailed { message: String },

    #[error("package {id} is locked by another installation ({lock_path})")]
    PackageLocked { id: String, lock_path: String },

    #[error("backup restore failed for {original}: {message} (backup kept at {backup})")]
    BackupRestoreFailed {
        original: String,
        backup: String,
        message: String,
    },

    #[error("installation cancelled")]
    Cancelled,
}

impl InstallError {
    /// Shorthand for a failed filesystem call on `path`
    #[must_use]
    pub fn fs(operation: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::FilesystemError {
            operation: operation.to_string(),
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageLocked { .. } => Some(
                "Wait for the other installation to finish. Remove the lock file only if no installer is running.",
            ),
            Self::BackupRestoreFailed { .. } => Some(
                "Manual intervention required: move the backup directory back to the module path.",
            ),
            Self::FilesystemError { .. } => {
                Some("Check permissions and free space on the target directory.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::PackageLocked { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::FilesystemError { .. } => "install.filesystem",
            Self::AtomicOperationFailed { .. } => "install.atomic_operation_failed",
            Self::PackageLocked { .. } => "install.package_locked",
            Self::BackupRestoreFailed { .. } => "install.backup_restore_failed",
            Self::Cancelled => "install.cancelled",
        };
        Some(code)
    }
}
