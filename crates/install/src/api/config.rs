use modinstall_config::Config;
use modinstall_errors::Error;
use modinstall_types::{DEFAULT_HOST, DEFAULT_REFERENCE};
use std::path::PathBuf;

/// Installer configuration
#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Parent of the per-run staging directories
    pub staging_root: PathBuf,
    /// Directory holding one subdirectory per installed package
    pub target_root: PathBuf,
    /// Host package sources must live on
    pub source_host: String,
    /// Replaces `https://<host>` in archive URLs
    pub archive_base_url: Option<String>,
    /// Branch installed when the caller names none
    pub default_reference: String,
    /// Manifest files tried inside the package root, in order
    pub manifest_files: Vec<String>,
    /// Namespace segment preceding the package id
    pub namespace_marker: String,
    /// Namespace under which installed packages live
    pub namespace_prefix: String,
    /// Namespace suffixes tried during migration discovery
    pub migration_suffixes: Vec<String>,
    /// Directory inside the installed package holding migrations
    pub migration_directory: String,
}

impl InstallConfig {
    /// Defaults for everything except the two roots
    #[must_use]
    pub fn new(staging_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        let manifest = modinstall_config::ManifestConfig::default();
        let migration = modinstall_config::MigrationConfig::default();
        Self {
            staging_root: staging_root.into(),
            target_root: target_root.into(),
            source_host: DEFAULT_HOST.to_string(),
            archive_base_url: None,
            default_reference: DEFAULT_REFERENCE.to_string(),
            manifest_files: manifest.files,
            namespace_marker: manifest.namespace_marker,
            namespace_prefix: migration.namespace_prefix,
            migration_suffixes: migration.suffixes,
            migration_directory: migration.directory,
        }
    }

    /// Build from the application configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no target root is configured.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            staging_root: config.staging_root(),
            target_root: config.target_root()?,
            source_host: config.source.host.clone(),
            archive_base_url: config.source.archive_base_url.clone(),
            default_reference: config.source.default_ref.clone(),
            manifest_files: config.manifest.files.clone(),
            namespace_marker: config.manifest.namespace_marker.clone(),
            namespace_prefix: config.migration.namespace_prefix.clone(),
            migration_suffixes: config.migration.suffixes.clone(),
            migration_directory: config.migration.directory.clone(),
        })
    }

    /// Fetch archives from a mirror instead of the source host
    #[must_use]
    pub fn with_archive_base_url(mut self, base: impl Into<String>) -> Self {
        self.archive_base_url = Some(base.into());
        self
    }

    #[must_use]
    pub fn with_default_reference(mut self, reference: impl Into<String>) -> Self {
        self.default_reference = reference.into();
        self
    }

    #[must_use]
    pub fn with_migration_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.migration_suffixes = suffixes;
        self
    }
}
