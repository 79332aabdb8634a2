//! Package identity from an extracted tree

use crate::parser::{ManifestParser, PhpManifestParser};
use modinstall_config::ManifestConfig;
use modinstall_errors::{Error, PackageError};
use modinstall_types::{is_safe_id, PackageManifest};
use std::io;
use std::path::Path;
use tokio::fs;

/// Derives the id a package is installed under
///
/// Manifest files are tried in order; the first one yielding a safe id
/// wins. Without any, the package root's directory name is used.
#[derive(Debug, Clone)]
pub struct PackageIdentifier<P: ManifestParser = PhpManifestParser> {
    parser: P,
    manifest_files: Vec<String>,
}

impl PackageIdentifier<PhpManifestParser> {
    /// PHP parser and manifest list taken from configuration
    #[must_use]
    pub fn from_config(config: &ManifestConfig) -> Self {
        Self::new(
            PhpManifestParser::new(config.namespace_marker.clone()),
            config.files.clone(),
        )
    }
}

impl Default for PackageIdentifier<PhpManifestParser> {
    fn default() -> Self {
        Self::from_config(&ManifestConfig::default())
    }
}

impl<P: ManifestParser> PackageIdentifier<P> {
    #[must_use]
    pub fn new(parser: P, manifest_files: Vec<String>) -> Self {
        Self {
            parser,
            manifest_files,
        }
    }

    /// Identify the package rooted at `package_root`
    ///
    /// # Errors
    ///
    /// Returns `PackageError::Unreadable` if the root or a manifest file
    /// cannot be read, and `PackageError::InvalidId` when falling back to a
    /// directory name that is not a safe id.
    pub async fn identify(&self, package_root: &Path) -> Result<PackageManifest, Error> {
        let metadata = fs::metadata(package_root)
            .await
            .map_err(|e| unreadable(package_root, &e))?;
        if !metadata.is_dir() {
            return Err(PackageError::Unreadable {
                path: package_root.display().to_string(),
                message: "not a directory".to_string(),
            }
            .into());
        }

        let mut first_namespace = None;

        for relative in &self.manifest_files {
            let path = package_root.join(relative);
            let content = match fs::read(&path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) if path.is_dir() => {
                    tracing::debug!(path = %path.display(), error = %e, "manifest path is a directory");
                    continue;
                }
                Err(e) => return Err(unreadable(&path, &e)),
            };

            let hints = self.parser.inspect(&content);

            let id = hints
                .candidate_ids()
                .find(|id| {
                    let safe = is_safe_id(id);
                    if !safe {
                        tracing::warn!(id = %id, manifest = %path.display(), "ignoring unsafe package id");
                    }
                    safe
                })
                .map(str::to_string);

            if let Some(id) = id {
                tracing::debug!(id = %id, manifest = %path.display(), "package identified from manifest");
                return Ok(PackageManifest::new(
                    id,
                    hints.namespace.or(first_namespace),
                    package_root.to_path_buf(),
                ));
            }

            if first_namespace.is_none() {
                first_namespace = hints.namespace;
            }
        }

        let fallback = package_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_safe_id(&fallback) {
            return Err(PackageError::InvalidId { id: fallback }.into());
        }

        tracing::debug!(id = %fallback, "package identified from directory name");
        Ok(PackageManifest::new(
            fallback,
            first_namespace,
            package_root.to_path_buf(),
        ))
    }
}

fn unreadable(path: &Path, err: &io::Error) -> Error {
    PackageError::Unreadable {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
