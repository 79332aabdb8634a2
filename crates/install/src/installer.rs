//! Installation orchestrator

use crate::discovery::{discover, migration_candidates};
use crate::lock::PackageLocks;
use crate::staging::StagingGuard;
use crate::swap;
use crate::{InstallConfig, InstallContext};
use modinstall_archive::{ArchiveExtractor, ZipExtractor};
use modinstall_errors::{Error, PackageError, UserFacingError};
use modinstall_events::{AppEvent, EventEmitter, EventSender, FailureContext, InstallEvent};
use modinstall_manifest::{ManifestParser, PackageIdentifier, PhpManifestParser};
use modinstall_migrate::MigrationRunner;
use modinstall_net::ArchiveFetcher;
use modinstall_types::{
    BackupRecord, InstallPhase, InstallationResult, PackageManifest, PackageSource, StagedPackage,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use uuid::Uuid;

/// A run that stopped early
struct Failure {
    phase: InstallPhase,
    error: Error,
    /// Replaces the generated message when set
    message: Option<String>,
    package_id: Option<String>,
}

impl Failure {
    fn new(phase: InstallPhase, error: Error) -> Self {
        Self {
            phase,
            error,
            message: None,
            package_id: None,
        }
    }

    fn for_package(mut self, id: &str) -> Self {
        self.package_id = Some(id.to_string());
        self
    }

    fn into_result(self) -> InstallationResult {
        let message = self
            .message
            .unwrap_or_else(|| format!("{}: {}", phase_summary(self.phase), self.error.user_message()));
        InstallationResult::failed(self.phase, &self.error, message, self.package_id)
    }
}

fn phase_summary(phase: InstallPhase) -> &'static str {
    match phase {
        InstallPhase::Validating => "Invalid module source",
        InstallPhase::Fetching => "Download failed",
        InstallPhase::Extracting => "Extraction failed",
        InstallPhase::Identifying => "Could not identify module",
        InstallPhase::BackingUp => "Could not back up the installed module",
        InstallPhase::Swapping => "Could not move the module into place",
        InstallPhase::MigrationDiscovery | InstallPhase::Migrating => "Migrations failed",
        _ => "Installation failed",
    }
}

/// Per-run state threaded through the stages
struct Run {
    events: Option<EventSender>,
    phase: InstallPhase,
}

impl EventEmitter for Run {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl Run {
    fn enter(&mut self, phase: InstallPhase) {
        tracing::debug!(%phase, "entering phase");
        self.phase = phase;
        self.emit_phase(phase);
    }

    fn fail(&self, error: Error) -> Failure {
        Failure::new(self.phase, error)
    }
}

/// Installs packages from remote source archives
///
/// Each call to [`Installer::install`] runs fetch, extract, identify,
/// backup, swap, migrate and cleanup in order. Failures after the swap roll
/// the target directory back to its previous state.
#[derive(Clone)]
pub struct Installer {
    config: InstallConfig,
    fetcher: Arc<dyn ArchiveFetcher>,
    extractor: Arc<dyn ArchiveExtractor>,
    identifier: PackageIdentifier<Arc<dyn ManifestParser>>,
    runner: Arc<dyn MigrationRunner>,
    locks: PackageLocks,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Zip extraction and PHP manifest parsing; fetcher and runner injected
    #[must_use]
    pub fn new(
        config: InstallConfig,
        fetcher: Arc<dyn ArchiveFetcher>,
        runner: Arc<dyn MigrationRunner>,
    ) -> Self {
        let parser: Arc<dyn ManifestParser> =
            Arc::new(PhpManifestParser::new(config.namespace_marker.clone()));
        let identifier = PackageIdentifier::new(parser, config.manifest_files.clone());
        Self {
            config,
            fetcher,
            extractor: Arc::new(ZipExtractor::new()),
            identifier,
            runner,
            locks: PackageLocks::new(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_manifest_parser(mut self, parser: Arc<dyn ManifestParser>) -> Self {
        self.identifier = PackageIdentifier::new(parser, self.config.manifest_files.clone());
        self
    }

    /// Share a lock table with other installers targeting the same root
    #[must_use]
    pub fn with_locks(mut self, locks: PackageLocks) -> Self {
        self.locks = locks;
        self
    }

    #[must_use]
    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Install the package described by `context`
    ///
    /// Never fails: every outcome, including rollback, is reported through
    /// the returned [`InstallationResult`].
    pub async fn install(&self, context: InstallContext) -> InstallationResult {
        let started = Instant::now();
        let mut run = Run {
            events: context.event_sender.clone(),
            phase: InstallPhase::Idle,
        };

        let result = match self.execute(&context, &mut run).await {
            Ok(result) => {
                run.enter(InstallPhase::Completed);
                if let Some(id) = &result.package_id {
                    run.emit(AppEvent::Install(InstallEvent::Completed {
                        package_id: id.clone(),
                        migrations_applied: result.migrations_applied,
                        duration: started.elapsed(),
                    }));
                }
                result
            }
            Err(failure) => {
                tracing::error!(
                    phase = %failure.phase,
                    error = %failure.error,
                    source = %context.source_url,
                    "installation failed"
                );
                run.emit(AppEvent::Install(InstallEvent::Failed {
                    package_id: failure.package_id.clone(),
                    phase: failure.phase,
                    failure: FailureContext::from_error(&failure.error),
                }));
                run.enter(InstallPhase::Failed);
                failure.into_result()
            }
        };

        tracing::info!(
            success = result.success,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "installation finished"
        );
        result
    }

    async fn execute(
        &self,
        context: &InstallContext,
        run: &mut Run,
    ) -> Result<InstallationResult, Failure> {
        run.enter(InstallPhase::Validating);
        let reference = context
            .reference
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(&self.config.default_reference);
        let source = PackageSource::parse(&context.source_url, &self.config.source_host)
            .and_then(|source| source.with_reference(reference.trim()))
            .map_err(|e| run.fail(e))?;

        run.enter(InstallPhase::Fetching);
        let (staged, guard) = StagingGuard::create(&self.config.staging_root, Uuid::new_v4())
            .await
            .map_err(|e| run.fail(e))?;

        run.emit(AppEvent::Install(InstallEvent::Started {
            source: source.to_string(),
            reference: source.reference.clone(),
            staging_path: staged.root.clone(),
        }));

        let outcome = self.install_staged(&source, &staged, run).await;

        run.enter(InstallPhase::CleanupStaging);
        if let Err(e) = guard.cleanup().await {
            tracing::warn!(error = %e, "failed to remove staging directory");
            run.emit_warning_with_context("failed to remove staging directory", e.to_string());
        }

        outcome
    }

    async fn install_staged(
        &self,
        source: &PackageSource,
        staged: &StagedPackage,
        run: &mut Run,
    ) -> Result<InstallationResult, Failure> {
        let url = source.archive_url(self.config.archive_base_url.as_deref());
        tracing::info!(%url, "fetching package archive");
        self.fetcher
            .fetch(&url, &staged.download_path)
            .await
            .map_err(|e| run.fail(e))?;

        run.enter(InstallPhase::Extracting);
        self.extractor
            .extract(&staged.download_path, &staged.extracted_root)
            .await
            .map_err(|e| run.fail(e))?;

        run.enter(InstallPhase::Identifying);
        let package_root = find_package_root(&staged.extracted_root)
            .await
            .map_err(|e| run.fail(e))?;
        let manifest = self
            .identifier
            .identify(&package_root)
            .await
            .map_err(|e| run.fail(e))?;
        run.emit(AppEvent::Install(InstallEvent::Identified {
            package_id: manifest.id.clone(),
            namespace: manifest.namespace.clone(),
        }));

        self.deploy(&manifest, run)
            .await
            .map_err(|failure| failure.for_package(&manifest.id))
    }

    /// Stages 5 to 10: everything that touches the target root
    async fn deploy(
        &self,
        manifest: &PackageManifest,
        run: &mut Run,
    ) -> Result<InstallationResult, Failure> {
        let target_root = &self.config.target_root;
        let id = manifest.id.as_str();

        run.enter(InstallPhase::BackingUp);
        fs::create_dir_all(target_root)
            .await
            .map_err(|e| run.fail(Error::io_with_path(&e, target_root)))?;
        let _lock = self
            .locks
            .acquire(target_root, id)
            .await
            .map_err(|e| run.fail(e))?;

        let backup = swap::backup_existing(target_root, id)
            .await
            .map_err(|e| run.fail(e))?;
        if let Some(record) = &backup {
            run.emit(AppEvent::Install(InstallEvent::BackupCreated {
                package_id: id.to_string(),
                original_path: record.original_path.clone(),
                backup_path: record.backup_path.clone(),
            }));
        }

        run.enter(InstallPhase::Swapping);
        let install_path = match swap::swap_into_place(&manifest.source_path, target_root, id).await {
            Ok(path) => path,
            Err(error) => {
                let failure = run.fail(error);
                return Err(self.roll_back(manifest, backup.as_ref(), failure, run).await);
            }
        };
        run.emit(AppEvent::Install(InstallEvent::Swapped {
            package_id: id.to_string(),
            install_path,
        }));

        let applied = match self.migrate(manifest, run).await {
            Ok(applied) => applied,
            Err(error) => {
                let mut failure = run.fail(error);
                failure.message = Some(migration_failure_message(
                    id,
                    &failure.error,
                    backup.is_some(),
                ));
                return Err(self.roll_back(manifest, backup.as_ref(), failure, run).await);
            }
        };

        run.enter(InstallPhase::Cleanup);
        if let Some(record) = &backup {
            if let Err(e) = swap::discard_backup(record).await {
                tracing::warn!(backup = %record.backup_path.display(), error = %e, "failed to remove backup");
                run.emit_warning_with_context(
                    format!("backup of {id} could not be removed"),
                    record.backup_path.display().to_string(),
                );
            }
        }

        Ok(InstallationResult::installed(id, applied))
    }

    async fn migrate(&self, manifest: &PackageManifest, run: &mut Run) -> Result<usize, Error> {
        run.enter(InstallPhase::MigrationDiscovery);
        let candidates = migration_candidates(manifest, &self.config);
        let Some((target, pending)) = discover(self.runner.as_ref(), &candidates, &*run).await? else {
            tracing::info!(id = %manifest.id, "no pending migrations");
            return Ok(0);
        };

        run.enter(InstallPhase::Migrating);
        tracing::info!(migration_target = %target, pending, "applying migrations");
        self.runner.apply_pending(&target).await
    }

    /// Undo the swap, returning the failure to report
    async fn roll_back(
        &self,
        manifest: &PackageManifest,
        backup: Option<&BackupRecord>,
        failure: Failure,
        run: &mut Run,
    ) -> Failure {
        let failed_phase = failure.phase;
        run.enter(InstallPhase::RestoringBackup);

        match swap::restore(&self.config.target_root, &manifest.id, backup).await {
            Ok(()) => {
                run.emit(AppEvent::Install(InstallEvent::RolledBack {
                    package_id: manifest.id.clone(),
                    restored_backup: backup.is_some(),
                }));
                failure
            }
            Err(restore_error) => {
                tracing::error!(
                    id = %manifest.id,
                    error = %restore_error,
                    cause = %failure.error,
                    "rollback failed"
                );
                let backup_note = backup.map_or_else(String::new, |record| {
                    format!(" Backup kept at {}.", record.backup_path.display())
                });
                let message = format!(
                    "Module {} failed during {failed_phase} ({}) and the previous state could not be restored: {restore_error}.{backup_note}",
                    manifest.id, failure.error
                );
                Failure {
                    phase: InstallPhase::RestoringBackup,
                    error: restore_error,
                    message: Some(message),
                    package_id: failure.package_id,
                }
            }
        }
    }
}

fn migration_failure_message(id: &str, error: &Error, had_backup: bool) -> String {
    let outcome = if had_backup {
        "The previous version was restored."
    } else {
        "The new files were removed."
    };
    format!("Module {id} files were installed but migrations failed: {error}. {outcome}")
}

/// Lexically first top-level directory of the extracted archive
async fn find_package_root(extracted_root: &Path) -> Result<PathBuf, Error> {
    let empty = || -> Error {
        PackageError::EmptyPackage {
            path: extracted_root.display().to_string(),
        }
        .into()
    };

    let mut entries = match fs::read_dir(extracted_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(empty()),
        Err(e) => return Err(Error::io_with_path(&e, extracted_root)),
    };

    let mut directories = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, extracted_root))?
    {
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            directories.push(entry.path());
        }
    }

    directories.sort();
    directories.into_iter().next().ok_or_else(empty)
}
