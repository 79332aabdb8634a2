//! Per-package mutual exclusion

use dashmap::DashMap;
use modinstall_errors::{Error, InstallError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process lock table keyed by `(target_root, id)`
///
/// Installs of the same package from this process queue on an async mutex;
/// a lock file next to the package directory excludes other processes.
#[derive(Clone, Debug, Default)]
pub struct PackageLocks {
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Held while a package directory is being replaced
#[derive(Debug)]
pub struct PackageLock {
    _file: LockFile,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
    key: PathBuf,
}

impl Drop for PackageLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table still references the mutex: nobody is waiting
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[derive(Debug)]
struct LockFile {
    path: Option<PathBuf>,
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Best-effort cleanup - ignore errors
        if let Some(path) = &self.path {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl PackageLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the cross-process lock file for `id`
    #[must_use]
    pub fn lock_path(target_root: &Path, id: &str) -> PathBuf {
        target_root.join(format!(".{id}.lock"))
    }

    /// Wait for the in-process lock, then claim the lock file
    ///
    /// # Errors
    ///
    /// Returns `InstallError::PackageLocked` when another process holds the
    /// lock file, or a filesystem error if it cannot be created.
    pub async fn acquire(&self, target_root: &Path, id: &str) -> Result<PackageLock, Error> {
        let key = target_root.join(id);
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        let mut lock = PackageLock {
            _file: LockFile { path: None },
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            key,
        };

        let path = Self::lock_path(target_root, id);
        lock._file = claim_lock_file(&path, id).await?;
        Ok(lock)
    }
}

async fn claim_lock_file(path: &Path, id: &str) -> Result<LockFile, Error> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file.into_std().await,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(InstallError::PackageLocked {
                id: id.to_string(),
                lock_path: path.display().to_string(),
            }
            .into());
        }
        Err(e) => return Err(InstallError::fs("create lock file", path, &e).into()),
    };

    let lock = LockFile {
        path: Some(path.to_path_buf()),
    };
    let _ = writeln!(file, "{}", std::process::id());
    Ok(lock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_file_lifecycle() {
        let temp = tempfile::tempdir().unwrap();
        let locks = PackageLocks::new();

        let lock = locks.acquire(temp.path(), "widgets").await.unwrap();
        assert!(PackageLocks::lock_path(temp.path(), "widgets").exists());

        drop(lock);
        assert!(!PackageLocks::lock_path(temp.path(), "widgets").exists());
    }

    #[tokio::test]
    async fn test_foreign_lock_file_fails_fast() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(PackageLocks::lock_path(temp.path(), "widgets"), "4242").unwrap();

        let err = PackageLocks::new()
            .acquire(temp.path(), "widgets")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::PackageLocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_same_id_waits_other_ids_do_not() {
        let temp = tempfile::tempdir().unwrap();
        let locks = PackageLocks::new();

        let held = locks.acquire(temp.path(), "widgets").await.unwrap();

        let other = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(temp.path(), "gadgets"),
        )
        .await;
        assert!(matches!(other, Ok(Ok(_))));

        let same = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(temp.path(), "widgets"),
        )
        .await;
        assert!(same.is_err());

        drop(held);
        let same = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(temp.path(), "widgets"),
        )
        .await;
        assert!(matches!(same, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_released_locks_leave_no_table_entries() {
        let temp = tempfile::tempdir().unwrap();
        let locks = PackageLocks::new();

        for id in ["widgets", "gadgets", "sprockets"] {
            let lock = locks.acquire(temp.path(), id).await.unwrap();
            assert_eq!(locks.locks.len(), 1);
            drop(lock);
        }
        assert!(locks.locks.is_empty());

        // A failed file claim releases its entry too
        std::fs::write(PackageLocks::lock_path(temp.path(), "widgets"), "4242").unwrap();
        assert!(locks.acquire(temp.path(), "widgets").await.is_err());
        assert!(locks.locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_another_task_waits() {
        let temp = tempfile::tempdir().unwrap();
        let locks = PackageLocks::new();

        let held = locks.acquire(temp.path(), "widgets").await.unwrap();
        let waiter = {
            let locks = locks.clone();
            let root = temp.path().to_path_buf();
            tokio::spawn(async move {
                let lock = locks.acquire(&root, "widgets").await.unwrap();
                drop(lock);
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(held);
        assert_eq!(locks.locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.locks.is_empty());
    }
}
