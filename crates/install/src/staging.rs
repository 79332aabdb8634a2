//! Run-scoped staging directories

use modinstall_errors::{Error, InstallError};
use modinstall_types::StagedPackage;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Removes a run's staging directory when dropped
///
/// Normal completion calls [`StagingGuard::cleanup`]; the drop path covers
/// early returns and a cancelled install future.
#[derive(Debug)]
pub struct StagingGuard {
    path: Option<PathBuf>,
}

impl StagingGuard {
    /// Create the staging layout for a new run
    ///
    /// # Errors
    ///
    /// Returns an error if the run directory cannot be created.
    pub async fn create(staging_root: &Path, run_id: Uuid) -> Result<(StagedPackage, Self), Error> {
        let staged = StagedPackage::new(staging_root, run_id);
        fs::create_dir_all(&staged.root)
            .await
            .map_err(|e| InstallError::fs("create staging directory", &staged.root, &e))?;

        let guard = Self {
            path: Some(staged.root.clone()),
        };
        Ok((staged, guard))
    }

    /// Remove the staging directory now
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub async fn cleanup(mut self) -> Result<(), Error> {
        let Some(path) = self.path.take() else {
            return Ok(());
        };
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InstallError::fs("remove staging directory", &path, &e).into()),
        }
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            // Best effort cleanup - ignore errors in destructor
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = fs::remove_dir_all(&path).await;
                });
            } else {
                let _ = std::fs::remove_dir_all(&path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_removes_run_directory() {
        let temp = tempfile::tempdir().unwrap();
        let (staged, guard) = StagingGuard::create(temp.path(), Uuid::new_v4())
            .await
            .unwrap();
        std::fs::write(staged.root.join("module.zip"), b"zip").unwrap();

        guard.cleanup().await.unwrap();
        assert!(!staged.root.exists());
    }

    #[test]
    fn test_drop_outside_runtime_removes_directory() {
        let temp = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (staged, guard) = runtime
            .block_on(StagingGuard::create(temp.path(), Uuid::new_v4()))
            .unwrap();
        drop(runtime);

        drop(guard);
        assert!(!staged.root.exists());
    }
}
