//! Validated remote package sources

use modinstall_errors::{Error, SourceError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Host accepted when no other host is configured
pub const DEFAULT_HOST: &str = "github.com";

/// Branch installed when the caller does not name one
pub const DEFAULT_REFERENCE: &str = "master";

static SOURCE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://([^/]+)/([A-Za-z0-9_-]+)/([A-Za-z0-9_-]+)(?:/.*)?$")
        .expect("source URL pattern is valid")
});

/// A repository that packages are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSource {
    /// Host the repository lives on
    pub host: String,
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch whose archive is installed
    pub reference: String,
}

impl PackageSource {
    /// Parse a repository URL of the form `scheme://host/owner/repo[/...]`
    ///
    /// Only URLs on `host` are accepted. The reference is set to
    /// [`DEFAULT_REFERENCE`]; use [`PackageSource::with_reference`] to change it.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Missing` for blank input and
    /// `SourceError::InvalidUrl` when the URL does not have the expected shape.
    pub fn parse(url: &str, host: &str) -> Result<Self, Error> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SourceError::Missing.into());
        }

        let invalid = |reason: &str| -> Error {
            SourceError::InvalidUrl {
                url: url.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let captures = SOURCE_URL
            .captures(url)
            .ok_or_else(|| invalid("expected scheme://host/owner/repo"))?;

        let actual_host = &captures[1];
        if !actual_host.eq_ignore_ascii_case(host) {
            return Err(invalid(&format!("host must be {host}")));
        }

        Ok(Self {
            host: host.to_ascii_lowercase(),
            owner: captures[2].to_string(),
            repo: captures[3].to_string(),
            reference: DEFAULT_REFERENCE.to_string(),
        })
    }

    /// Replace the reference, validating that it is safe to place in a URL path
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidReference` if the reference is empty or
    /// contains characters or segments that could alter the archive URL.
    pub fn with_reference(mut self, reference: &str) -> Result<Self, Error> {
        validate_reference(reference)?;
        self.reference = reference.to_string();
        Ok(self)
    }

    /// Archive URL for this source
    ///
    /// `base` overrides the default `https://<host>` origin (mirrors, tests).
    #[must_use]
    pub fn archive_url(&self, base: Option<&str>) -> String {
        let base = base.map_or_else(
            || format!("https://{}", self.host),
            |b| b.trim_end_matches('/').to_string(),
        );
        format!(
            "{base}/{}/{}/archive/refs/heads/{}.zip",
            self.owner, self.repo, self.reference
        )
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}@{}", self.host, self.owner, self.repo, self.reference)
    }
}

fn validate_reference(reference: &str) -> Result<(), Error> {
    let reject = |reason: &str| -> Result<(), Error> {
        Err(SourceError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
        .into())
    };

    if reference.is_empty() {
        return reject("reference is empty");
    }
    if !reference
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
    {
        return reject("only letters, digits, '.', '_', '-' and '/' are allowed");
    }
    if reference.contains("..") || reference.contains("//") {
        return reject("empty or parent segments are not allowed");
    }
    if reference.starts_with('/') || reference.starts_with('-') || reference.ends_with('/') {
        return reject("reference must not start with '/' or '-' or end with '/'");
    }
    Ok(())
}
