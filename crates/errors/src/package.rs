//! Package identification error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("no module found in package: {path}")]
    EmptyPackage { path: String },

    #[error("package tree unreadable at {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("invalid package id: {id}")]
    InvalidId { id: String },
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::EmptyPackage { .. } => {
                Some("The archive must contain the module inside a top-level directory.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::EmptyPackage { .. } => "package.empty",
            Self::Unreadable { .. } => "package.unreadable",
            Self::InvalidId { .. } => "package.invalid_id",
        };
        Some(code)
    }
}
