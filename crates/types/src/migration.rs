//! Migration discovery types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Location a migration runner is asked about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MigrationTarget {
    /// Backslash-separated namespace, e.g. `humhub\modules\widgets\migrations`
    Namespace(String),
    /// Directory holding migration files
    Path(PathBuf),
}

impl MigrationTarget {
    /// Interpret a user-supplied string: anything containing a backslash is a namespace
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.contains('\\') {
            Self::Namespace(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for MigrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace(ns) => f.write_str(ns),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A migration that has not been applied yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDescriptor {
    /// Version recorded in the migration ledger
    pub version: String,
    /// File holding the migration
    pub path: PathBuf,
}
