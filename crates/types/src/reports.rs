//! Report type definitions for operations

use crate::InstallPhase;
use modinstall_errors::{Error, ErrorKind, UserFacingError};
use serde::{Deserialize, Serialize};

/// Outcome of one installation run
///
/// This is the only value the installer hands back; failures are encoded
/// here rather than returned as errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationResult {
    /// Whether the new version is live
    pub success: bool,
    /// Human readable summary
    pub message: String,
    /// Id the package was installed (or would have been installed) under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    /// Number of migrations applied
    pub migrations_applied: usize,
    /// Failure class, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Stable error code, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Phase the run failed in, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<InstallPhase>,
}

impl InstallationResult {
    /// Successful installation of `package_id`
    #[must_use]
    pub fn installed(package_id: impl Into<String>, migrations_applied: usize) -> Self {
        let package_id = package_id.into();
        let mut message = format!("Module {package_id} installed.");
        if migrations_applied > 0 {
            message.push_str(&format!(" Migrations applied: {migrations_applied}."));
        }
        Self {
            success: true,
            message,
            package_id: Some(package_id),
            migrations_applied,
            error_kind: None,
            error_code: None,
            failed_phase: None,
        }
    }

    /// Failed run, classified from `error`
    #[must_use]
    pub fn failed(
        phase: InstallPhase,
        error: &Error,
        message: impl Into<String>,
        package_id: Option<String>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            package_id,
            migrations_applied: 0,
            error_kind: Some(error.kind()),
            error_code: error.user_code().map(str::to_string),
            failed_phase: Some(phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modinstall_errors::MigrationError;

    #[test]
    fn test_installed_message() {
        let result = InstallationResult::installed("widgets", 0);
        assert!(result.success);
        assert_eq!(result.message, "Module widgets installed.");

        let result = InstallationResult::installed("widgets", 2);
        assert_eq!(result.message, "Module widgets installed. Migrations applied: 2.");
    }

    #[test]
    fn test_failed_serialization() {
        let err: Error = MigrationError::ApplyFailed {
            version: "m1".into(),
            message: "boom".into(),
        }
        .into();
        let result = InstallationResult::failed(
            InstallPhase::Migrating,
            &err,
            "migrations failed",
            Some("widgets".into()),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["packageId"], "widgets");
        assert_eq!(json["migrationsApplied"], 0);
        assert_eq!(json["errorKind"], "migration");
        assert_eq!(json["errorCode"], "migration.apply_failed");
        assert_eq!(json["failedPhase"], "migrating");
    }
}
