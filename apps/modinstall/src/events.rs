//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{style, Term};
use modinstall_events::{AppEvent, DownloadEvent, GeneralEvent, InstallEvent, MigrationEvent};
use modinstall_types::InstallPhase;

/// Turns events into status lines on stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppresses console output (JSON mode)
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);
        if self.quiet {
            return;
        }

        match &event {
            AppEvent::Install(install_event) => self.handle_install_event(install_event),
            AppEvent::Download(download_event) => self.handle_download_event(download_event),
            AppEvent::Migration(migration_event) => self.handle_migration_event(migration_event),
            AppEvent::General(general_event) => self.handle_general_event(general_event),
        }
    }

    fn handle_install_event(&self, event: &InstallEvent) {
        match event {
            InstallEvent::Started {
                source, reference, ..
            } => {
                self.show_status(&format!("Installing {source} ({reference})"));
            }
            InstallEvent::PhaseChanged { phase } => {
                if let Some(label) = phase_label(*phase) {
                    self.show_status(label);
                }
            }
            InstallEvent::Identified {
                package_id,
                namespace,
            } => match namespace {
                Some(ns) => self.show_status(&format!("Identified module {package_id} ({ns})")),
                None => self.show_status(&format!("Identified module {package_id}")),
            },
            InstallEvent::BackupCreated { backup_path, .. } => {
                self.show_status(&format!(
                    "Backed up existing installation to {}",
                    backup_path.display()
                ));
            }
            InstallEvent::RolledBack {
                package_id,
                restored_backup,
            } => {
                if *restored_backup {
                    self.show_warning(&format!("Restored previous version of {package_id}"));
                } else {
                    self.show_warning(&format!("Removed partially installed {package_id}"));
                }
            }
            InstallEvent::Swapped { .. }
            | InstallEvent::Completed { .. }
            | InstallEvent::Failed { .. } => {}
        }
    }

    fn handle_download_event(&self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Retrying {
                attempt,
                max_attempts,
                reason,
                ..
            } => {
                self.show_warning(&format!(
                    "Download attempt {attempt}/{max_attempts} failed ({reason}), retrying"
                ));
            }
            DownloadEvent::Completed { final_size, .. } => {
                self.show_status(&format!("Downloaded {}", format_size(*final_size)));
            }
            DownloadEvent::Started { .. } | DownloadEvent::Failed { .. } => {}
        }
    }

    fn handle_migration_event(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::CandidateChecked { target, pending } if self.debug_enabled => {
                self.show_status(&format!("Checked {target}: {pending} pending"));
            }
            MigrationEvent::Started { target, count } => {
                self.show_status(&format!("Applying {count} migration(s) from {target}"));
            }
            MigrationEvent::Failed { failure, .. } => {
                self.show_error(&failure.message);
            }
            _ => {}
        }
    }

    fn handle_general_event(&self, event: &GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(ctx) => self.show_warning(&format!("{message}: {ctx}")),
                None => self.show_warning(message),
            },
            GeneralEvent::Error { message, .. } => self.show_error(message),
            GeneralEvent::DebugLog { message, .. } if self.debug_enabled => {
                self.show_status(message);
            }
            _ => {}
        }
    }

    fn show_status(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("::").cyan().bold())
        } else {
            format!(":: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_warning(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("warning:").yellow().bold())
        } else {
            format!("warning: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("error:").red().bold())
        } else {
            format!("error: {message}")
        };
        let _ = self.term.write_line(&line);
    }
}

fn phase_label(phase: InstallPhase) -> Option<&'static str> {
    match phase {
        InstallPhase::Fetching => Some("Downloading archive"),
        InstallPhase::Extracting => Some("Extracting archive"),
        InstallPhase::Swapping => Some("Moving files into place"),
        InstallPhase::MigrationDiscovery => Some("Looking for migrations"),
        InstallPhase::RestoringBackup => Some("Rolling back"),
        _ => None,
    }
}

/// Format a byte count for humans
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{size:.0} {}", UNITS[unit_index])
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_phase_labels_skip_quiet_phases() {
        assert!(phase_label(InstallPhase::Validating).is_none());
        assert_eq!(phase_label(InstallPhase::Fetching), Some("Downloading archive"));
    }
}
