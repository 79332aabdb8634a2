use modinstall_types::InstallPhase;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::FailureContext;

/// Installation run events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    /// Run accepted its input and allocated staging
    Started {
        source: String,
        reference: String,
        staging_path: PathBuf,
    },

    /// Run moved into a new phase
    PhaseChanged { phase: InstallPhase },

    /// Package identity derived from the extracted tree
    Identified {
        package_id: String,
        namespace: Option<String>,
    },

    /// Existing installation moved aside
    BackupCreated {
        package_id: String,
        original_path: PathBuf,
        backup_path: PathBuf,
    },

    /// New files are live
    Swapped {
        package_id: String,
        install_path: PathBuf,
    },

    /// Previous state put back after a failure
    RolledBack {
        package_id: String,
        restored_backup: bool,
    },

    /// Run finished with the new version live
    Completed {
        package_id: String,
        migrations_applied: usize,
        duration: Duration,
    },

    /// Run failed
    Failed {
        package_id: Option<String>,
        phase: InstallPhase,
        failure: FailureContext,
    },
}
