//! Identified package metadata

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity derived from an extracted package tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Directory name the package is installed under; never empty
    pub id: String,
    /// Namespace declared by the package, if any
    pub namespace: Option<String>,
    /// Root of the extracted package
    pub source_path: PathBuf,
}

impl PackageManifest {
    #[must_use]
    pub fn new(id: impl Into<String>, namespace: Option<String>, source_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            namespace,
            source_path,
        }
    }
}

/// Whether `id` can be used as a single directory name under the target root
#[must_use]
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id.len() <= 255
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ids() {
        assert!(is_safe_id("widgets"));
        assert!(is_safe_id("widgets-main"));
        assert!(is_safe_id("my_module.v2"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id(".."));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a\\b"));
        assert!(!is_safe_id("wid gets"));
    }
}
