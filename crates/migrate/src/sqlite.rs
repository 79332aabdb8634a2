//! `SQLite` migration runner

use crate::MigrationRunner;
use async_trait::async_trait;
use modinstall_errors::{Error, MigrationError};
use modinstall_events::{AppEvent, EventEmitter, EventSender, FailureContext, MigrationEvent};
use modinstall_types::{MigrationDescriptor, MigrationTarget};
use sqlx::{query, Pool, Row, Sqlite};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Table recording applied migration versions
pub const LEDGER_TABLE: &str = "migration";

/// Applies `*.sql` migration files against a `SQLite` database
///
/// Files in a migration directory run in lexical order and their stem is
/// the version recorded in the ledger. Ledger rows are scoped to the
/// canonical migration directory, so two packages may both ship an
/// `m0001_init.sql`. Namespaces are mapped to directories
/// through registered roots: with root `humhub\modules` at `/srv/modules`,
/// `humhub\modules\widgets\migrations` resolves to
/// `/srv/modules/widgets/migrations`.
#[derive(Clone)]
pub struct SqliteMigrationRunner {
    pool: Pool<Sqlite>,
    namespace_roots: Vec<(String, PathBuf)>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for SqliteMigrationRunner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl SqliteMigrationRunner {
    /// Wrap an existing pool, creating the ledger table if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger table cannot be created.
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self, Error> {
        query(
            "CREATE TABLE IF NOT EXISTS migration (
                scope TEXT NOT NULL,
                version TEXT NOT NULL,
                apply_time INTEGER NOT NULL,
                PRIMARY KEY (scope, version)
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            namespace_roots: Vec::new(),
            event_sender: None,
        })
    }

    /// Open (or create) the database at `db_path`
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialised.
    pub async fn open(db_path: &Path) -> Result<Self, Error> {
        let pool = crate::create_pool(db_path).await?;
        Self::new(pool).await
    }

    /// Map namespaces under `prefix` to subdirectories of `dir`
    #[must_use]
    pub fn with_namespace_root(mut self, prefix: &str, dir: impl Into<PathBuf>) -> Self {
        self.namespace_roots
            .push((prefix.trim_matches('\\').to_string(), dir.into()));
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Directory holding migrations for `target`, if it maps to one
    #[must_use]
    pub fn resolve(&self, target: &MigrationTarget) -> Option<PathBuf> {
        match target {
            MigrationTarget::Path(path) => Some(path.clone()),
            MigrationTarget::Namespace(namespace) => {
                let namespace = namespace.trim_matches('\\');
                self.namespace_roots.iter().find_map(|(prefix, dir)| {
                    let rest = if namespace == prefix {
                        ""
                    } else {
                        namespace.strip_prefix(prefix.as_str())?.strip_prefix('\\')?
                    };
                    let mut resolved = dir.clone();
                    for segment in rest.split('\\').filter(|s| !s.is_empty()) {
                        if segment == "." || segment == ".." || segment.contains('/') {
                            return None;
                        }
                        resolved.push(segment);
                    }
                    Some(resolved)
                })
            }
        }
    }

    /// Every migration file in `dir`, sorted by version
    async fn migration_files(
        dir: &Path,
        target: &MigrationTarget,
    ) -> Result<Vec<MigrationDescriptor>, Error> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(discovery_failed(target, &e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| discovery_failed(target, &e))?
        {
            let path = entry.path();
            let is_sql = path.extension().is_some_and(|ext| ext == "sql");
            if !is_sql || !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                files.push(MigrationDescriptor {
                    version: stem.to_string_lossy().into_owned(),
                    path,
                });
            }
        }

        files.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(files)
    }

    /// Ledger scope for a migration directory
    ///
    /// Namespace and path targets naming the same directory share a scope.
    async fn ledger_scope(dir: &Path) -> String {
        tokio::fs::canonicalize(dir)
            .await
            .unwrap_or_else(|_| dir.to_path_buf())
            .to_string_lossy()
            .into_owned()
    }

    async fn applied_versions(&self, scope: &str) -> Result<HashSet<String>, Error> {
        let rows = query("SELECT version FROM migration WHERE scope = ?1")
            .bind(scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("version"))
            .collect())
    }

    /// Ledger scope and unapplied files for `target`
    async fn pending_with_scope(
        &self,
        target: &MigrationTarget,
    ) -> Result<(String, Vec<MigrationDescriptor>), Error> {
        let Some(dir) = self.resolve(target) else {
            return Ok((String::new(), Vec::new()));
        };

        let files = Self::migration_files(&dir, target).await?;
        if files.is_empty() {
            return Ok((String::new(), files));
        }

        let scope = Self::ledger_scope(&dir).await;
        let applied = self.applied_versions(&scope).await?;
        let pending = files
            .into_iter()
            .filter(|file| !applied.contains(&file.version))
            .collect();
        Ok((scope, pending))
    }

    async fn apply_all(&self, scope: &str, pending: &[MigrationDescriptor]) -> Result<usize, Error> {
        let mut tx = self.pool.begin().await?;

        for migration in pending {
            let sql = tokio::fs::read_to_string(&migration.path)
                .await
                .map_err(|e| MigrationError::ReadFailed {
                    path: migration.path.display().to_string(),
                    message: e.to_string(),
                })?;

            query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrationError::ApplyFailed {
                    version: migration.version.clone(),
                    message: e.to_string(),
                })?;

            query("INSERT INTO migration (scope, version, apply_time) VALUES (?1, ?2, ?3)")
                .bind(scope)
                .bind(&migration.version)
                .bind(chrono::Utc::now().timestamp())
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrationError::ApplyFailed {
                    version: migration.version.clone(),
                    message: e.to_string(),
                })?;

            tracing::debug!(version = %migration.version, "migration applied");
        }

        tx.commit().await?;
        Ok(pending.len())
    }
}

#[async_trait]
impl MigrationRunner for SqliteMigrationRunner {
    async fn pending_migrations(
        &self,
        target: &MigrationTarget,
    ) -> Result<Vec<MigrationDescriptor>, Error> {
        let (_, pending) = self.pending_with_scope(target).await?;
        Ok(pending)
    }

    async fn apply_pending(&self, target: &MigrationTarget) -> Result<usize, Error> {
        let (scope, pending) = self.pending_with_scope(target).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        self.emit(AppEvent::Migration(MigrationEvent::Started {
            target: target.to_string(),
            count: pending.len(),
        }));

        match self.apply_all(&scope, &pending).await {
            Ok(applied) => {
                self.emit(AppEvent::Migration(MigrationEvent::Completed {
                    target: target.to_string(),
                    applied,
                }));
                Ok(applied)
            }
            Err(err) => {
                tracing::error!(migration_target = %target, error = %err, "migrations rolled back");
                self.emit(AppEvent::Migration(MigrationEvent::Failed {
                    target: target.to_string(),
                    failure: FailureContext::from_error(&err),
                }));
                Err(err)
            }
        }
    }
}

fn discovery_failed(target: &MigrationTarget, err: &io::Error) -> Error {
    MigrationError::DiscoveryFailed {
        target: target.to_string(),
        message: err.to_string(),
    }
    .into()
}
