//! Installation run state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Stage of an installation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPhase {
    Idle,
    Validating,
    Fetching,
    Extracting,
    Identifying,
    BackingUp,
    Swapping,
    MigrationDiscovery,
    Migrating,
    Cleanup,
    RestoringBackup,
    CleanupStaging,
    Completed,
    Failed,
}

impl InstallPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Identifying => "identifying",
            Self::BackingUp => "backing_up",
            Self::Swapping => "swapping",
            Self::MigrationDiscovery => "migration_discovery",
            Self::Migrating => "migrating",
            Self::Cleanup => "cleanup",
            Self::RestoringBackup => "restoring_backup",
            Self::CleanupStaging => "cleanup_staging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-scoped staging locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    /// Unique id of the run owning this staging area
    pub run_id: Uuid,
    /// Run directory under the staging root
    pub root: PathBuf,
    /// Downloaded archive
    pub download_path: PathBuf,
    /// Directory the archive is unpacked into
    pub extracted_root: PathBuf,
}

impl StagedPackage {
    /// Lay out a fresh staging area for `run_id` under `staging_root`
    #[must_use]
    pub fn new(staging_root: &std::path::Path, run_id: Uuid) -> Self {
        let root = staging_root.join(run_id.to_string());
        Self {
            run_id,
            download_path: root.join("module.zip"),
            extracted_root: root.join("extracted"),
            root,
        }
    }
}

/// A live package directory renamed aside while a new version is installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Where the package lives when installed
    pub original_path: PathBuf,
    /// Where the previous version was moved to
    pub backup_path: PathBuf,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_matches_serde_name() {
        for phase in [
            InstallPhase::BackingUp,
            InstallPhase::MigrationDiscovery,
            InstallPhase::RestoringBackup,
        ] {
            let json = serde_json::to_value(phase).unwrap();
            assert_eq!(json, phase.to_string());
        }
    }
}
