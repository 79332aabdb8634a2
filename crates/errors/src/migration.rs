//! Schema migration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum MigrationError {
    #[error("migration discovery failed for {target}: {message}")]
    DiscoveryFailed { target: String, message: String },

    #[error("migration {version} failed: {message}")]
    ApplyFailed { version: String, message: String },

    #[error("failed to read migration {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("database error: {message}")]
    Database { message: String },
}

impl UserFacingError for MigrationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ApplyFailed { .. } => {
                Some("Fix the failing migration in the module and install again.")
            }
            Self::Database { .. } => Some("Check that the application database is reachable."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DiscoveryFailed { .. } => "migration.discovery_failed",
            Self::ApplyFailed { .. } => "migration.apply_failed",
            Self::ReadFailed { .. } => "migration.read_failed",
            Self::Database { .. } => "migration.database",
        };
        Some(code)
    }
}
