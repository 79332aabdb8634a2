//! Migration discovery for an installed package

use crate::InstallConfig;
use modinstall_errors::Error;
use modinstall_events::{AppEvent, EventEmitter, MigrationEvent};
use modinstall_migrate::MigrationRunner;
use modinstall_types::{MigrationTarget, PackageManifest};

/// Locations to ask the runner about, in priority order, without duplicates
///
/// Declared namespace first, then the conventional namespace under the
/// configured prefix, then the migration directory inside the installed
/// package.
#[must_use]
pub fn migration_candidates(
    manifest: &PackageManifest,
    config: &InstallConfig,
) -> Vec<MigrationTarget> {
    let prefix = config.namespace_prefix.trim_matches('\\');
    let mut candidates = Vec::new();

    if let Some(namespace) = manifest.namespace.as_deref() {
        let namespace = namespace.trim_matches('\\');
        for suffix in &config.migration_suffixes {
            candidates.push(MigrationTarget::Namespace(format!("{namespace}\\{suffix}")));
        }
    }

    for suffix in &config.migration_suffixes {
        candidates.push(MigrationTarget::Namespace(format!(
            "{prefix}\\{}\\{suffix}",
            manifest.id
        )));
    }

    candidates.push(MigrationTarget::Path(
        config
            .target_root
            .join(&manifest.id)
            .join(&config.migration_directory),
    ));

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// First candidate with pending migrations, and how many it has
pub(crate) async fn discover(
    runner: &dyn MigrationRunner,
    candidates: &[MigrationTarget],
    events: &impl EventEmitter,
) -> Result<Option<(MigrationTarget, usize)>, Error> {
    for candidate in candidates {
        let pending = runner.pending_migrations(candidate).await?;
        tracing::debug!(target_location = %candidate, pending = pending.len(), "migration candidate checked");
        events.emit(AppEvent::Migration(MigrationEvent::CandidateChecked {
            target: candidate.to_string(),
            pending: pending.len(),
        }));
        if !pending.is_empty() {
            return Ok(Some((candidate.clone(), pending.len())));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> InstallConfig {
        InstallConfig::new("/tmp/staging", "/srv/modules")
    }

    #[test]
    fn test_candidates_with_declared_namespace() {
        let manifest = PackageManifest::new(
            "widgets",
            Some(r"acme\widgets".to_string()),
            PathBuf::from("/tmp/x"),
        );
        assert_eq!(
            migration_candidates(&manifest, &config()),
            vec![
                MigrationTarget::Namespace(r"acme\widgets\migrations".into()),
                MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into()),
                MigrationTarget::Path(PathBuf::from("/srv/modules/widgets/migrations")),
            ]
        );
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let manifest = PackageManifest::new(
            "widgets",
            Some(r"humhub\modules\widgets".to_string()),
            PathBuf::from("/tmp/x"),
        );
        assert_eq!(
            migration_candidates(&manifest, &config()),
            vec![
                MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into()),
                MigrationTarget::Path(PathBuf::from("/srv/modules/widgets/migrations")),
            ]
        );
    }

    #[test]
    fn test_candidates_without_namespace() {
        let manifest = PackageManifest::new("widgets", None, PathBuf::from("/tmp/x"));
        let config = config().with_migration_suffixes(vec!["migrations".into(), "db".into()]);
        assert_eq!(
            migration_candidates(&manifest, &config),
            vec![
                MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into()),
                MigrationTarget::Namespace(r"humhub\modules\widgets\db".into()),
                MigrationTarget::Path(PathBuf::from("/srv/modules/widgets/migrations")),
            ]
        );
    }
}
