#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Archive extraction for modinstall
//!
//! Unpacks downloaded zip archives into a staging directory. Every entry
//! name is checked before anything is written, so an archive carrying a
//! path that would land outside the destination is refused as a whole.

mod zip_extractor;

pub use zip_extractor::ZipExtractor;

use async_trait::async_trait;
use modinstall_errors::Error;
use std::path::Path;

/// What an extraction wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Unpacks an archive into a directory
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest`, creating `dest` if needed
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<ExtractSummary, Error>;
}

/// Whether a raw entry name could resolve outside the extraction root
///
/// Both separators are considered since archives built on Windows may use
/// backslashes.
#[must_use]
pub fn is_unsafe_entry_name(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }

    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }

    name.split(['/', '\\']).any(|segment| segment == "..")
}
