//! Backup, swap and restore of package directories
//!
//! Every move of a live directory is a rename, so at no point do two
//! directories claim `target/id`.

use chrono::{DateTime, Utc};
use modinstall_errors::{Error, InstallError};
use modinstall_types::BackupRecord;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Sibling path the current installation of `id` is moved to
pub(crate) async fn free_backup_path(target_root: &Path, id: &str, now: DateTime<Utc>) -> PathBuf {
    let base = format!("{id}_backup_{}", now.format("%Y%m%d%H%M%S"));
    let mut candidate = target_root.join(&base);
    let mut suffix = 1u32;
    while fs::try_exists(&candidate).await.unwrap_or(false) {
        candidate = target_root.join(format!("{base}_{suffix}"));
        suffix += 1;
    }
    candidate
}

/// Move an existing installation aside
///
/// Returns `None` when nothing is installed under `id`.
pub(crate) async fn backup_existing(
    target_root: &Path,
    id: &str,
) -> Result<Option<BackupRecord>, Error> {
    let original_path = target_root.join(id);
    match fs::symlink_metadata(&original_path).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(InstallError::fs("inspect installed package", &original_path, &e).into()),
    }

    let created_at = Utc::now();
    let backup_path = free_backup_path(target_root, id, created_at).await;
    fs::rename(&original_path, &backup_path)
        .await
        .map_err(|e| InstallError::fs("move installed package to backup", &original_path, &e))?;

    tracing::info!(
        original = %original_path.display(),
        backup = %backup_path.display(),
        "existing installation backed up"
    );
    Ok(Some(BackupRecord {
        original_path,
        backup_path,
        created_at,
    }))
}

/// Move the staged package root to `target/id`
///
/// A plain rename is tried first. When staging lives on another filesystem
/// the tree is copied into a hidden sibling of the destination and renamed
/// from there.
pub(crate) async fn swap_into_place(
    staged_root: &Path,
    target_root: &Path,
    id: &str,
) -> Result<PathBuf, Error> {
    let destination = target_root.join(id);

    match fs::rename(staged_root, &destination).await {
        Ok(()) => return Ok(destination),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                from = %staged_root.display(),
                to = %destination.display(),
                "staging is on another filesystem, copying"
            );
        }
        Err(e) => return Err(InstallError::fs("move package into place", &destination, &e).into()),
    }

    let incoming = target_root.join(format!(".{id}.incoming-{}", Uuid::new_v4()));
    if let Err(err) = copy_directory_recursive(staged_root, &incoming).await {
        let _ = fs::remove_dir_all(&incoming).await;
        return Err(err);
    }
    if let Err(e) = fs::rename(&incoming, &destination).await {
        let _ = fs::remove_dir_all(&incoming).await;
        return Err(InstallError::fs("move package into place", &destination, &e).into());
    }

    Ok(destination)
}

/// Put the previous installation back after a failed run
///
/// Whatever the run placed at the original path is removed first. Without
/// a backup this just removes the new directory.
pub(crate) async fn restore(target_root: &Path, id: &str, backup: Option<&BackupRecord>) -> Result<(), Error> {
    let original = target_root.join(id);

    let restore_failed = |message: String| -> Error {
        match backup {
            Some(record) => InstallError::BackupRestoreFailed {
                original: original.display().to_string(),
                backup: record.backup_path.display().to_string(),
                message,
            }
            .into(),
            None => InstallError::AtomicOperationFailed { message }.into(),
        }
    };

    match fs::remove_dir_all(&original).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(restore_failed(format!("could not remove new files: {e}"))),
    }

    if let Some(record) = backup {
        fs::rename(&record.backup_path, &record.original_path)
            .await
            .map_err(|e| restore_failed(format!("could not rename backup: {e}")))?;
        tracing::info!(path = %record.original_path.display(), "previous installation restored");
    }

    Ok(())
}

/// Delete a backup that is no longer needed
pub(crate) async fn discard_backup(record: &BackupRecord) -> Result<(), Error> {
    fs::remove_dir_all(&record.backup_path)
        .await
        .map_err(|e| InstallError::fs("remove backup", &record.backup_path, &e).into())
}

/// Copy a directory tree, preserving file permissions
pub(crate) async fn copy_directory_recursive(source: &Path, dest: &Path) -> Result<(), Error> {
    fs::create_dir_all(dest)
        .await
        .map_err(|e| InstallError::fs("create directory", dest, &e))?;

    let mut entries = fs::read_dir(source)
        .await
        .map_err(|e| InstallError::fs("read directory", source, &e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| InstallError::fs("read directory", source, &e))?
    {
        let entry_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| InstallError::fs("inspect", &entry_path, &e))?;

        if file_type.is_dir() {
            Box::pin(copy_directory_recursive(&entry_path, &dest_path)).await?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(&entry_path)
                .await
                .map_err(|e| InstallError::fs("read symlink", &entry_path, &e))?;
            copy_symlink(&link, &dest_path).await?;
        } else {
            fs::copy(&entry_path, &dest_path)
                .await
                .map_err(|e| InstallError::fs("copy file", &entry_path, &e))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn copy_symlink(link: &Path, dest: &Path) -> Result<(), Error> {
    fs::symlink(link, dest)
        .await
        .map_err(|e| InstallError::fs("create symlink", dest, &e).into())
}

#[cfg(not(unix))]
async fn copy_symlink(_link: &Path, dest: &Path) -> Result<(), Error> {
    Err(InstallError::AtomicOperationFailed {
        message: format!("cannot copy symlink to {}", dest.display()),
    }
    .into())
}
