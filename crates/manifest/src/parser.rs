//! Static-text manifest inspection

use regex::Regex;
use std::sync::{Arc, LazyLock};

/// What a manifest file says about its package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestHints {
    /// Declared namespace, without a leading separator
    pub namespace: Option<String>,
    /// Id taken from the namespace segment after the marker
    pub namespace_id: Option<String>,
    /// Id declared through an assignment or constant
    pub declared_id: Option<String>,
}

impl ManifestHints {
    /// Candidate ids in priority order
    pub fn candidate_ids(&self) -> impl Iterator<Item = &str> {
        self.namespace_id
            .as_deref()
            .into_iter()
            .chain(self.declared_id.as_deref())
    }
}

/// Extracts identity hints from manifest text without evaluating it
pub trait ManifestParser: Send + Sync {
    fn inspect(&self, content: &str) -> ManifestHints;
}

impl<T: ManifestParser + ?Sized> ManifestParser for Arc<T> {
    fn inspect(&self, content: &str) -> ManifestHints {
        (**self).inspect(content)
    }
}

static NAMESPACE_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|\s)namespace\s+\\?([A-Za-z_][A-Za-z0-9_]*(?:\\[A-Za-z_][A-Za-z0-9_]*)*)\s*[;{]")
        .expect("namespace statement pattern is valid")
});

static NAMESPACE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]namespace['"]\s*=>\s*['"]([^'"]+)['"]"#)
        .expect("namespace entry pattern is valid")
});

static DECLARED_ID: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r#"['"]id['"]\s*=>\s*['"]([^'"]+)['"]"#,
        r#"\$id\s*=\s*['"]([^'"]+)['"]"#,
        r#"const\s+ID\s*=\s*['"]([^'"]+)['"]"#,
    ]
    .map(|pattern| Regex::new(pattern).expect("id pattern is valid"))
});

/// Recognises PHP module declarations
///
/// `namespace humhub\modules\widgets;` and `'namespace' => 'humhub\modules\widgets'`
/// both yield the namespace; the segment after `namespace_marker` becomes
/// the id. `'id' => '...'`, `$id = '...'` and `const ID = '...'` are read
/// as declared ids.
#[derive(Debug, Clone)]
pub struct PhpManifestParser {
    namespace_marker: String,
}

impl PhpManifestParser {
    #[must_use]
    pub fn new(namespace_marker: impl Into<String>) -> Self {
        Self {
            namespace_marker: namespace_marker.into(),
        }
    }

    fn find_namespace(content: &str) -> Option<String> {
        let raw = NAMESPACE_STATEMENT
            .captures(content)
            .or_else(|| NAMESPACE_ENTRY.captures(content))
            .map(|captures| captures[1].to_string())?;

        // single-quoted PHP strings often carry doubled separators
        let normalized = raw.replace(r"\\", r"\");
        let trimmed = normalized.trim().trim_matches('\\');
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn id_from_namespace(&self, namespace: &str) -> Option<String> {
        let mut segments = namespace.split('\\');
        segments.find(|segment| *segment == self.namespace_marker)?;
        segments
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
    }
}

impl Default for PhpManifestParser {
    fn default() -> Self {
        Self::new("modules")
    }
}

impl ManifestParser for PhpManifestParser {
    fn inspect(&self, content: &str) -> ManifestHints {
        let namespace = Self::find_namespace(content);
        let namespace_id = namespace
            .as_deref()
            .and_then(|ns| self.id_from_namespace(ns));
        let declared_id = DECLARED_ID
            .iter()
            .find_map(|pattern| pattern.captures(content))
            .map(|captures| captures[1].trim().to_string());

        ManifestHints {
            namespace,
            namespace_id,
            declared_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_statement() {
        let hints = PhpManifestParser::default()
            .inspect("<?php\n\nnamespace humhub\\modules\\widgets;\n\nclass Module {}\n");
        assert_eq!(hints.namespace.as_deref(), Some(r"humhub\modules\widgets"));
        assert_eq!(hints.namespace_id.as_deref(), Some("widgets"));
        assert_eq!(hints.declared_id, None);
    }

    #[test]
    fn test_namespace_config_entry() {
        let content = r"<?php
return [
    'id' => 'calendar-extra',
    'namespace' => 'humhub\\modules\\calendar',
];";
        let hints = PhpManifestParser::default().inspect(content);
        assert_eq!(hints.namespace.as_deref(), Some(r"humhub\modules\calendar"));
        assert_eq!(hints.namespace_id.as_deref(), Some("calendar"));
        assert_eq!(hints.declared_id.as_deref(), Some("calendar-extra"));
        assert_eq!(
            hints.candidate_ids().collect::<Vec<_>>(),
            vec!["calendar", "calendar-extra"]
        );
    }

    #[test]
    fn test_namespace_without_marker() {
        let hints = PhpManifestParser::default()
            .inspect("<?php\nnamespace acme\\widgets;\nclass Module { public $id = 'gadgets'; }");
        assert_eq!(hints.namespace.as_deref(), Some(r"acme\widgets"));
        assert_eq!(hints.namespace_id, None);
        assert_eq!(hints.declared_id.as_deref(), Some("gadgets"));
    }

    #[test]
    fn test_marker_as_last_segment() {
        let hints = PhpManifestParser::default().inspect("<?php namespace app\\modules;");
        assert_eq!(hints.namespace_id, None);
    }

    #[test]
    fn test_const_id() {
        let hints = PhpManifestParser::default()
            .inspect("<?php\nclass Module {\n    const ID = 'polls';\n}");
        assert_eq!(hints.declared_id.as_deref(), Some("polls"));
    }

    #[test]
    fn test_custom_marker() {
        let hints = PhpManifestParser::new("plugins")
            .inspect("<?php namespace app\\plugins\\gallery\\controllers;");
        assert_eq!(hints.namespace_id.as_deref(), Some("gallery"));
    }
}
