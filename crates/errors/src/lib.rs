#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for modinstall
//!
//! This crate provides fine-grained error types organized by installation
//! stage. Every error type is `Clone` so that failures can be carried into
//! events and installation results without losing the original.

use std::borrow::Cow;

use thiserror::Error;

pub mod archive;
pub mod config;
pub mod install;
pub mod migration;
pub mod network;
pub mod package;
pub mod source;

// Re-export all error types at the root
pub use archive::ArchiveError;
pub use config::ConfigError;
pub use install::InstallError;
pub use migration::MigrationError;
pub use network::NetworkError;
pub use package::PackageError;
pub use source::SourceError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("invalid source: {0}")]
    Source(#[from] SourceError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        #[cfg_attr(feature = "serde", serde(with = "io_kind_as_str"))]
        kind: std::io::ErrorKind,
        message: String,
        #[cfg_attr(feature = "serde", serde(with = "opt_path_buf"))]
        path: Option<std::path::PathBuf>,
    },
}

/// Coarse failure classes reported to callers of the installer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    InvalidSource,
    Fetch,
    Timeout,
    Extract,
    EmptyPackage,
    Migration,
    BackupRestore,
    Config,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSource => "invalid_source",
            Self::Fetch => "fetch",
            Self::Timeout => "timeout",
            Self::Extract => "extract",
            Self::EmptyPackage => "empty_package",
            Self::Migration => "migration",
            Self::BackupRestore => "backup_restore",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Classify this error into one of the installer failure kinds
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Source(_) => ErrorKind::InvalidSource,
            Error::Network(NetworkError::Timeout { .. }) => ErrorKind::Timeout,
            Error::Network(_) => ErrorKind::Fetch,
            Error::Archive(_) => ErrorKind::Extract,
            Error::Package(PackageError::EmptyPackage { .. }) => ErrorKind::EmptyPackage,
            Error::Migration(_) => ErrorKind::Migration,
            Error::Install(InstallError::BackupRestoreFailed { .. }) => ErrorKind::BackupRestore,
            Error::Config(_) => ErrorKind::Config,
            Error::Package(_) | Error::Install(_) | Error::Internal(_) | Error::Io { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Migration(MigrationError::Database {
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for modinstall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Source(err) => err.user_message(),
            Error::Network(err) => err.user_message(),
            Error::Archive(err) => err.user_message(),
            Error::Package(err) => err.user_message(),
            Error::Migration(err) => err.user_message(),
            Error::Install(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            Error::Internal(_) => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Source(err) => err.user_hint(),
            Error::Network(err) => err.user_hint(),
            Error::Archive(err) => err.user_hint(),
            Error::Package(err) => err.user_hint(),
            Error::Migration(err) => err.user_hint(),
            Error::Install(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_retryable(),
            Error::Install(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Source(err) => err.user_code(),
            Error::Network(err) => err.user_code(),
            Error::Archive(err) => err.user_code(),
            Error::Package(err) => err.user_code(),
            Error::Migration(err) => err.user_code(),
            Error::Install(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}

// Serde helper modules for optional path and io::ErrorKind as string
#[cfg(feature = "serde")]
mod io_kind_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(kind: &std::io::ErrorKind, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format!("{kind:?}"))
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<std::io::ErrorKind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Best effort mapping; default to Other
        Ok(match s.as_str() {
            "NotFound" => std::io::ErrorKind::NotFound,
            "PermissionDenied" => std::io::ErrorKind::PermissionDenied,
            "AlreadyExists" => std::io::ErrorKind::AlreadyExists,
            "InvalidInput" => std::io::ErrorKind::InvalidInput,
            "InvalidData" => std::io::ErrorKind::InvalidData,
            "TimedOut" => std::io::ErrorKind::TimedOut,
            "Interrupted" => std::io::ErrorKind::Interrupted,
            "Unsupported" => std::io::ErrorKind::Unsupported,
            "UnexpectedEof" => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::Other,
        })
    }
}

#[cfg(feature = "serde")]
mod opt_path_buf {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(path: &Option<std::path::PathBuf>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(pb) => s.serialize_some(&pb.display().to_string()),
            None => s.serialize_none(),
        }
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<std::path::PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        Ok(opt.map(std::path::PathBuf::from))
    }
}
