#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for modinstall
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/modinstall/config.toml)
//! - Environment variables
//! - CLI flags

use modinstall_errors::{ConfigError, Error};
use modinstall_types::{ColorChoice, OutputFormat, DEFAULT_HOST, DEFAULT_REFERENCE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub migration: MigrationConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Parent of the per-run staging directories
    pub staging_root: Option<PathBuf>,
    /// Directory holding one subdirectory per installed package
    pub target_root: Option<PathBuf>,
    /// SQLite database tracking applied migrations
    pub database_path: Option<PathBuf>,
    /// Directory for debug log files
    pub log_dir: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds, whole fetch
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

/// Where package archives come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Overrides `https://<host>` when building archive URLs (mirrors)
    #[serde(default)]
    pub archive_base_url: Option<String>,
    #[serde(default = "default_ref")]
    pub default_ref: String,
}

/// Manifest search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Relative paths tried in order inside the package root
    #[serde(default = "default_manifest_files")]
    pub files: Vec<String>,
    /// Namespace segment preceding the package id
    #[serde(default = "default_namespace_marker")]
    pub namespace_marker: String,
}

/// Migration discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    /// Directory inside an installed package holding migration files
    #[serde(default = "default_migration_directory")]
    pub directory: String,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            verify_tls: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            archive_base_url: None,
            default_ref: default_ref(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            files: default_manifest_files(),
            namespace_marker: default_namespace_marker(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: default_namespace_prefix(),
            suffixes: default_suffixes(),
            directory: default_migration_directory(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_verify_tls() -> bool {
    true
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_ref() -> String {
    DEFAULT_REFERENCE.to_string()
}

fn default_manifest_files() -> Vec<String> {
    ["Module.php", "module/Module.php", "config.php", "module/config.php"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_namespace_marker() -> String {
    "modules".to_string()
}

fn default_namespace_prefix() -> String {
    r"humhub\modules".to_string()
}

fn default_suffixes() -> Vec<String> {
    vec!["migrations".to_string()]
}

fn default_migration_directory() -> String {
    "migrations".to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("modinstall").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(output) = std::env::var("MODINSTALL_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => return Err(invalid("MODINSTALL_OUTPUT", output)),
            };
        }

        if let Ok(color) = std::env::var("MODINSTALL_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => return Err(invalid("MODINSTALL_COLOR", color)),
            };
        }

        if let Some(path) = non_empty_var("MODINSTALL_TARGET_ROOT") {
            self.paths.target_root = Some(PathBuf::from(path));
        }

        if let Some(path) = non_empty_var("MODINSTALL_STAGING_ROOT") {
            self.paths.staging_root = Some(PathBuf::from(path));
        }

        if let Some(path) = non_empty_var("MODINSTALL_DATABASE") {
            self.paths.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = non_empty_var("MODINSTALL_LOG_DIR") {
            self.paths.log_dir = Some(PathBuf::from(path));
        }

        if let Some(reference) = non_empty_var("MODINSTALL_DEFAULT_REF") {
            self.source.default_ref = reference;
        }

        if let Ok(verify) = std::env::var("MODINSTALL_VERIFY_TLS") {
            self.network.verify_tls = match verify.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(invalid("MODINSTALL_VERIFY_TLS", verify)),
            };
        }

        if let Ok(timeout) = std::env::var("MODINSTALL_TIMEOUT") {
            self.network.timeout = match timeout.parse() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(invalid("MODINSTALL_TIMEOUT", timeout)),
            };
        }

        Ok(())
    }

    /// Check values that deserialization alone cannot enforce
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for empty search lists or a zero timeout.
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.timeout == 0 {
            return Err(invalid("network.timeout", "0".to_string()));
        }
        if self.manifest.files.is_empty() {
            return Err(ConfigError::Invalid {
                message: "manifest.files must list at least one file".to_string(),
            }
            .into());
        }
        if self.migration.suffixes.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid {
                message: "migration.suffixes must not contain empty entries".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Get the target root
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when no target root was configured.
    pub fn target_root(&self) -> Result<PathBuf, Error> {
        self.paths.target_root.clone().ok_or_else(|| {
            ConfigError::MissingField {
                field: "target_root".to_string(),
            }
            .into()
        })
    }

    /// Get the staging root (with default)
    #[must_use]
    pub fn staging_root(&self) -> PathBuf {
        self.paths
            .staging_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("modinstall"))
    }

    /// Get the migration database path (with default)
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.paths.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("modinstall")
                .join("migrations.sqlite")
        })
    }

    /// Get the debug log directory (with default)
    ///
    /// Kept apart from the staging root, which is wiped after every run.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("modinstall")
                .join("logs")
        })
    }

    /// Whole-fetch timeout
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn invalid(field: &str, value: String) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.network.verify_tls);
        assert_eq!(config.source.host, "github.com");
        assert_eq!(config.source.default_ref, "master");
        assert_eq!(config.manifest.files[0], "Module.php");
        assert_eq!(config.manifest.files.len(), 4);
        assert_eq!(config.migration.namespace_prefix, r"humhub\modules");
        assert_eq!(config.migration.suffixes, vec!["migrations".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_root_required() {
        let config = Config::default();
        let err = config.target_root().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { ref field }) if field == "target_root"
        ));
    }

    #[test]
    fn test_log_dir_is_outside_staging_root() {
        let mut config = Config::default();
        config.paths.staging_root = Some(PathBuf::from("/srv/staging"));
        assert!(!config.log_dir().starts_with(config.staging_root()));
        assert!(config.log_dir().ends_with("modinstall/logs"));

        config.paths.log_dir = Some(PathBuf::from("/var/log/modinstall"));
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/modinstall"));
    }

    #[test]
    fn test_validate_rejects_empty_manifest_list() {
        let mut config = Config::default();
        config.manifest.files.clear();
        assert!(config.validate().is_err());
    }
}
