//! CLI error handling

use std::fmt;

use modinstall_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(modinstall_errors::Error),
    /// Operations error
    Ops(modinstall_errors::Error),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<modinstall_errors::Error> for CliError {
    fn from(e: modinstall_errors::Error) -> Self {
        match e {
            modinstall_errors::Error::Config(_) => CliError::Config(e),
            other => CliError::Ops(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modinstall_errors::{ConfigError, InstallError};

    #[test]
    fn test_conversion_routes_config_and_ops_errors() {
        let config: CliError = modinstall_errors::Error::from(ConfigError::MissingField {
            field: "target_root".into(),
        })
        .into();
        assert!(matches!(config, CliError::Config(_)));
        assert!(config.to_string().starts_with("Configuration error:"));

        let ops: CliError = modinstall_errors::Error::from(InstallError::PackageLocked {
            id: "widgets".into(),
            lock_path: "/srv/modules/.widgets.lock".into(),
        })
        .into();
        assert!(matches!(ops, CliError::Ops(_)));
        assert!(ops.to_string().contains("Code: "));
    }
}
