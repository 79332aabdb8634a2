//! Integration tests for the SQLite migration runner

#[cfg(test)]
mod tests {
    use modinstall_errors::{Error, MigrationError};
    use modinstall_migrate::*;
    use modinstall_types::MigrationTarget;
    use sqlx::Row;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_migration(dir: &Path, name: &str, sql: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), sql).unwrap();
    }

    async fn table_exists(runner: &SqliteMigrationRunner, table: &str) -> bool {
        sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(table)
            .fetch_one(runner.pool())
            .await
            .unwrap()
            .get::<i64, _>("n")
            > 0
    }

    #[tokio::test]
    async fn test_pending_and_apply_by_namespace() {
        let temp = tempdir().unwrap();
        let modules = temp.path().join("modules");
        let migrations = modules.join("widgets").join("migrations");
        write_migration(
            &migrations,
            "m0002_seed.sql",
            "INSERT INTO widget (name) VALUES ('first');",
        );
        write_migration(
            &migrations,
            "m0001_init.sql",
            "CREATE TABLE widget (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
        );
        write_migration(&migrations, "README.md", "not a migration");

        let runner = SqliteMigrationRunner::open(&temp.path().join("db").join("app.sqlite"))
            .await
            .unwrap()
            .with_namespace_root(r"humhub\modules", &modules);
        let target = MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into());

        let pending = runner.pending_migrations(&target).await.unwrap();
        let versions: Vec<_> = pending.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["m0001_init", "m0002_seed"]);

        assert_eq!(runner.apply_pending(&target).await.unwrap(), 2);
        assert!(runner.pending_migrations(&target).await.unwrap().is_empty());
        assert_eq!(runner.apply_pending(&target).await.unwrap(), 0);

        let ledger = sqlx::query("SELECT version FROM migration ORDER BY version")
            .fetch_all(runner.pool())
            .await
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].get::<String, _>("version"), "m0001_init");
    }

    #[tokio::test]
    async fn test_failure_rolls_back_every_migration() {
        let temp = tempdir().unwrap();
        let migrations = temp.path().join("migrations");
        write_migration(
            &migrations,
            "m0001_init.sql",
            "CREATE TABLE gadget (id INTEGER PRIMARY KEY);",
        );
        write_migration(&migrations, "m0002_broken.sql", "THIS IS NOT SQL;");

        let runner = SqliteMigrationRunner::open(&temp.path().join("app.sqlite"))
            .await
            .unwrap();
        let target = MigrationTarget::Path(migrations);

        let err = runner.apply_pending(&target).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Migration(MigrationError::ApplyFailed { ref version, .. }) if version == "m0002_broken"
        ));

        assert!(!table_exists(&runner, "gadget").await);
        assert_eq!(runner.pending_migrations(&target).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_targets_have_nothing_pending() {
        let temp = tempdir().unwrap();
        let runner = SqliteMigrationRunner::open(&temp.path().join("app.sqlite"))
            .await
            .unwrap()
            .with_namespace_root(r"humhub\modules", temp.path());

        let unknown = MigrationTarget::Namespace(r"acme\widgets\migrations".into());
        assert!(runner.pending_migrations(&unknown).await.unwrap().is_empty());

        let missing = MigrationTarget::Namespace(r"humhub\modules\nothing\migrations".into());
        assert!(runner.pending_migrations(&missing).await.unwrap().is_empty());

        let missing_path = MigrationTarget::Path(temp.path().join("nowhere"));
        assert_eq!(runner.apply_pending(&missing_path).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_packages_sharing_a_version_name_both_apply() {
        let temp = tempdir().unwrap();
        let modules = temp.path().join("modules");
        write_migration(
            &modules.join("alpha").join("migrations"),
            "m0001_init.sql",
            "CREATE TABLE alpha (id INTEGER PRIMARY KEY);",
        );
        write_migration(
            &modules.join("beta").join("migrations"),
            "m0001_init.sql",
            "CREATE TABLE beta (id INTEGER PRIMARY KEY);",
        );

        let runner = SqliteMigrationRunner::open(&temp.path().join("app.sqlite"))
            .await
            .unwrap()
            .with_namespace_root(r"humhub\modules", &modules);
        let alpha = MigrationTarget::Path(modules.join("alpha").join("migrations"));
        let beta = MigrationTarget::Namespace(r"humhub\modules\beta\migrations".into());

        assert_eq!(runner.apply_pending(&alpha).await.unwrap(), 1);
        assert_eq!(runner.pending_migrations(&beta).await.unwrap().len(), 1);
        assert_eq!(runner.apply_pending(&beta).await.unwrap(), 1);

        assert!(table_exists(&runner, "alpha").await);
        assert!(table_exists(&runner, "beta").await);
        assert!(runner.pending_migrations(&alpha).await.unwrap().is_empty());
        assert!(runner.pending_migrations(&beta).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_namespace_and_path_share_ledger_entries() {
        let temp = tempdir().unwrap();
        let modules = temp.path().join("modules");
        let migrations = modules.join("widgets").join("migrations");
        write_migration(
            &migrations,
            "m0001_init.sql",
            "CREATE TABLE widget (id INTEGER PRIMARY KEY);",
        );

        let runner = SqliteMigrationRunner::open(&temp.path().join("app.sqlite"))
            .await
            .unwrap()
            .with_namespace_root(r"humhub\modules", &modules);
        let by_namespace = MigrationTarget::Namespace(r"humhub\modules\widgets\migrations".into());

        assert_eq!(runner.apply_pending(&by_namespace).await.unwrap(), 1);
        let by_path = MigrationTarget::Path(migrations);
        assert!(runner.pending_migrations(&by_path).await.unwrap().is_empty());
        assert_eq!(runner.apply_pending(&by_path).await.unwrap(), 0);
    }
}
