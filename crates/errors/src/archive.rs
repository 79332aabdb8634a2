//! Archive extraction error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("corrupt or unsupported archive {path}: {message}")]
    CorruptArchive { path: String, message: String },

    #[error("unsafe archive entry rejected: {entry}")]
    UnsafeEntry { entry: String },

    #[error("extraction failed for {entry}: {message}")]
    ExtractionFailed { entry: String, message: String },
}

impl UserFacingError for ArchiveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CorruptArchive { .. } => {
                Some("The download is not a valid zip archive; check the branch name.")
            }
            Self::UnsafeEntry { .. } => {
                Some("The archive contains paths outside its root and was refused.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::OpenFailed { .. } => "archive.open_failed",
            Self::CorruptArchive { .. } => "archive.corrupt",
            Self::UnsafeEntry { .. } => "archive.unsafe_entry",
            Self::ExtractionFailed { .. } => "archive.extraction_failed",
        };
        Some(code)
    }
}
