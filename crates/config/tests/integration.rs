//! Integration tests for config

#[cfg(test)]
mod tests {
    use modinstall_config::*;
    use modinstall_types::{ColorChoice, OutputFormat};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "MODINSTALL_OUTPUT",
        "MODINSTALL_COLOR",
        "MODINSTALL_TARGET_ROOT",
        "MODINSTALL_STAGING_ROOT",
        "MODINSTALL_DATABASE",
        "MODINSTALL_DEFAULT_REF",
        "MODINSTALL_VERIFY_TLS",
        "MODINSTALL_TIMEOUT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"
color = "never"

[paths]
target_root = "/srv/app/modules"
staging_root = "/var/tmp/modinstall"

[network]
timeout = 30
verify_tls = false

[source]
archive_base_url = "http://127.0.0.1:8080"
default_ref = "main"

[manifest]
files = ["Module.php"]

[migration]
suffixes = ["migrations", "migrations_v2"]
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(
            config.target_root().unwrap(),
            PathBuf::from("/srv/app/modules")
        );
        assert_eq!(config.staging_root(), PathBuf::from("/var/tmp/modinstall"));
        assert_eq!(config.network.timeout, 30);
        assert_eq!(config.network.retries, 3);
        assert!(!config.network.verify_tls);
        assert_eq!(config.source.host, "github.com");
        assert_eq!(config.source.default_ref, "main");
        assert_eq!(config.manifest.files, vec!["Module.php".to_string()]);
        assert_eq!(config.manifest.namespace_marker, "modules");
        assert_eq!(config.migration.suffixes.len(), 2);
        assert_eq!(config.migration.directory, "migrations");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/config.toml")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[network\ntimeout = ").unwrap();
        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert_eq!(err.kind(), modinstall_errors::ErrorKind::Config);
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("MODINSTALL_OUTPUT", "json");
        std::env::set_var("MODINSTALL_COLOR", "always");
        std::env::set_var("MODINSTALL_TARGET_ROOT", "/srv/modules");
        std::env::set_var("MODINSTALL_DEFAULT_REF", "develop");
        std::env::set_var("MODINSTALL_VERIFY_TLS", "no");
        std::env::set_var("MODINSTALL_TIMEOUT", "5");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.target_root().unwrap(), PathBuf::from("/srv/modules"));
        assert_eq!(config.source.default_ref, "develop");
        assert!(!config.network.verify_tls);
        assert_eq!(config.fetch_timeout(), std::time::Duration::from_secs(5));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("MODINSTALL_TIMEOUT", "0");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
        std::env::set_var("MODINSTALL_VERIFY_TLS", "maybe");
        assert!(config.merge_env().is_err());

        clear_env();
    }
}
