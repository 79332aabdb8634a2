//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so
//! that `--debug` log files carry the whole run.

use modinstall_events::{AppEvent, DownloadEvent, GeneralEvent, InstallEvent, MigrationEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let domain = event.log_target();
    match event {
        AppEvent::Download(download_event) => match download_event {
            DownloadEvent::Started { url, total_size } => {
                info!(domain, url = %url, total_size = ?total_size, "Download started");
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                max_attempts,
                reason,
                backoff_delay,
            } => {
                warn!(
                    domain,
                    url = %url,
                    attempt,
                    max_attempts,
                    reason = %reason,
                    backoff_ms = u64::try_from(backoff_delay.as_millis()).unwrap_or(u64::MAX),
                    "Download retrying"
                );
            }
            DownloadEvent::Completed {
                url,
                final_size,
                total_time,
                hash,
            } => {
                info!(
                    domain,
                    url = %url,
                    bytes = final_size,
                    duration_ms = u64::try_from(total_time.as_millis()).unwrap_or(u64::MAX),
                    hash = %hash,
                    "Download completed"
                );
            }
            DownloadEvent::Failed { url, failure } => {
                error!(
                    domain,
                    url = %url,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Download failed"
                );
            }
        },

        AppEvent::Install(install_event) => match install_event {
            InstallEvent::Started {
                source,
                reference,
                staging_path,
            } => {
                info!(
                    domain,
                    source = %source,
                    reference = %reference,
                    staging = %staging_path.display(),
                    "Installation started"
                );
            }
            InstallEvent::PhaseChanged { phase } => {
                debug!(domain, phase = %phase, "Phase changed");
            }
            InstallEvent::Identified {
                package_id,
                namespace,
            } => {
                info!(domain, package = %package_id, namespace = ?namespace, "Package identified");
            }
            InstallEvent::BackupCreated {
                package_id,
                original_path,
                backup_path,
            } => {
                info!(
                    domain,
                    package = %package_id,
                    original = %original_path.display(),
                    backup = %backup_path.display(),
                    "Backup created"
                );
            }
            InstallEvent::Swapped {
                package_id,
                install_path,
            } => {
                info!(domain, package = %package_id, path = %install_path.display(), "Package swapped into place");
            }
            InstallEvent::RolledBack {
                package_id,
                restored_backup,
            } => {
                warn!(domain, package = %package_id, restored_backup, "Installation rolled back");
            }
            InstallEvent::Completed {
                package_id,
                migrations_applied,
                duration,
            } => {
                info!(
                    domain,
                    package = %package_id,
                    migrations_applied,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "Installation completed"
                );
            }
            InstallEvent::Failed {
                package_id,
                phase,
                failure,
            } => {
                error!(
                    domain,
                    package = ?package_id,
                    phase = %phase,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Installation failed"
                );
            }
        },

        AppEvent::Migration(migration_event) => match migration_event {
            MigrationEvent::CandidateChecked {
                target: location,
                pending,
            } => {
                debug!(domain, location = %location, pending, "Migration candidate checked");
            }
            MigrationEvent::Started {
                target: location,
                count,
            } => {
                info!(domain, location = %location, count, "Migrations started");
            }
            MigrationEvent::Completed {
                target: location,
                applied,
            } => {
                info!(domain, location = %location, applied, "Migrations completed");
            }
            MigrationEvent::Failed {
                target: location,
                failure,
            } => {
                error!(
                    domain,
                    location = %location,
                    code = ?failure.code,
                    message = %failure.message,
                    "Migrations failed"
                );
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(domain, message = %message, context = ?context, "Warning");
            }
            GeneralEvent::Error { message, details } => {
                error!(domain, message = %message, details = ?details, "Error");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(domain, message = %message, context = ?context, "Debug log");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                if *success {
                    info!(domain, operation = %operation, "Operation completed successfully");
                } else {
                    warn!(domain, operation = %operation, "Operation completed with issues");
                }
            }
            _ => match event.log_level() {
                tracing::Level::ERROR => error!(domain, event = ?general_event, "General event"),
                tracing::Level::WARN => warn!(domain, event = ?general_event, "General event"),
                tracing::Level::INFO => info!(domain, event = ?general_event, "General event"),
                tracing::Level::DEBUG => debug!(domain, event = ?general_event, "General event"),
                tracing::Level::TRACE => trace!(domain, event = ?general_event, "General event"),
            },
        },
    }
}
