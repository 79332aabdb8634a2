//! Integration tests for types

#[cfg(test)]
mod tests {
    use modinstall_errors::{Error, SourceError};
    use modinstall_types::*;
    use proptest::prelude::*;

    #[test]
    fn test_output_format_default() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt, OutputFormat::Tty);
    }

    #[test]
    fn test_staged_package_layout() {
        let run_id = Uuid::new_v4();
        let staged = StagedPackage::new(std::path::Path::new("/tmp/staging"), run_id);
        assert_eq!(staged.root, std::path::Path::new("/tmp/staging").join(run_id.to_string()));
        assert!(staged.download_path.starts_with(&staged.root));
        assert!(staged.extracted_root.starts_with(&staged.root));
    }

    #[test]
    fn test_migration_target_parse() {
        assert_eq!(
            MigrationTarget::parse(r"humhub\modules\widgets\migrations"),
            MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into())
        );
        assert_eq!(
            MigrationTarget::parse("/srv/modules/widgets/migrations"),
            MigrationTarget::Path("/srv/modules/widgets/migrations".into())
        );
    }

    proptest! {
        #[test]
        fn prop_single_segment_paths_are_rejected(owner in "[A-Za-z0-9_-]{1,20}") {
            let url = format!("https://github.com/{owner}");
            let err = PackageSource::parse(&url, DEFAULT_HOST).unwrap_err();
            prop_assert!(matches!(err, Error::Source(SourceError::InvalidUrl { .. })), "unexpected error: {:?}", err);
        }

        #[test]
        fn prop_other_hosts_are_rejected(
            host in "[a-z]{1,10}\\.(com|org|net)",
            owner in "[A-Za-z0-9_-]{1,20}",
            repo in "[A-Za-z0-9_-]{1,20}",
        ) {
            prop_assume!(host != "github.com");
            let url = format!("https://{host}/{owner}/{repo}");
            prop_assert!(PackageSource::parse(&url, DEFAULT_HOST).is_err());
        }

        #[test]
        fn prop_well_formed_sources_round_trip(
            owner in "[A-Za-z0-9_-]{1,20}",
            repo in "[A-Za-z0-9_-]{1,20}",
        ) {
            let url = format!("https://github.com/{owner}/{repo}");
            let source = PackageSource::parse(&url, DEFAULT_HOST).unwrap();
            prop_assert_eq!(source.owner, owner);
            prop_assert_eq!(source.repo, repo);
        }
    }
}
