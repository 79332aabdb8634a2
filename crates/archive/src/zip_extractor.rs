//! Zip extraction

use crate::{is_unsafe_entry_name, ArchiveExtractor, ExtractSummary};
use async_trait::async_trait;
use modinstall_errors::{ArchiveError, Error};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Extracts `.zip` archives on a blocking thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<ExtractSummary, Error> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();

        let summary = tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
            .await
            .map_err(|e| Error::internal(format!("extraction task failed: {e}")))??;

        tracing::debug!(
            files = summary.files,
            directories = summary.directories,
            bytes = summary.bytes,
            "archive extracted"
        );
        Ok(summary)
    }
}

fn extract_blocking(archive_path: &Path, dest: &Path) -> Result<ExtractSummary, Error> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::OpenFailed {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| ArchiveError::CorruptArchive {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })?;

    let entries = plan_entries(&mut archive, archive_path)?;

    fs::create_dir_all(dest).map_err(|e| extraction_failed(dest, &e))?;

    let mut summary = ExtractSummary::default();
    for (index, relative) in entries {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ArchiveError::CorruptArchive {
                path: archive_path.display().to_string(),
                message: e.to_string(),
            })?;
        let outpath = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| extraction_failed(&relative, &e))?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| extraction_failed(&relative, &e))?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| extraction_failed(&relative, &e))?;
        summary.bytes +=
            io::copy(&mut entry, &mut outfile).map_err(|e| extraction_failed(&relative, &e))?;
        summary.files += 1;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode & 0o777))
                    .map_err(|e| extraction_failed(&relative, &e))?;
            }
        }
    }

    Ok(summary)
}

/// Resolve every entry to a relative path, failing on the first unsafe one
fn plan_entries(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
) -> Result<Vec<(usize, PathBuf)>, Error> {
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveError::CorruptArchive {
                path: archive_path.display().to_string(),
                message: e.to_string(),
            })?;

        let name = entry.name().to_string();
        if is_unsafe_entry_name(&name) {
            return Err(ArchiveError::UnsafeEntry { entry: name }.into());
        }
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry {
                entry: name.clone(),
            })?;

        if relative.as_os_str().is_empty() {
            continue;
        }
        entries.push((index, relative));
    }

    Ok(entries)
}

fn extraction_failed(entry: &Path, err: &io::Error) -> Error {
    ArchiveError::ExtractionFailed {
        entry: entry.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
