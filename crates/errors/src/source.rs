//! Source URL validation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SourceError {
    #[error("source URL is required")]
    Missing,

    #[error("invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid reference `{reference}`: {reason}")]
    InvalidReference { reference: String, reason: String },
}

impl UserFacingError for SourceError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Missing | Self::InvalidUrl { .. } => {
                Some("Use a repository URL of the form https://github.com/<owner>/<repo>.")
            }
            Self::InvalidReference { .. } => {
                Some("Use a plain branch name such as `master` or `release/1.2`.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Missing => "source.missing",
            Self::InvalidUrl { .. } => "source.invalid_url",
            Self::InvalidReference { .. } => "source.invalid_reference",
        };
        Some(code)
    }
}
