#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Schema migrations for installed packages
//!
//! [`MigrationRunner`] is the seam the installer talks to. The crate ships
//! one implementation, [`SqliteMigrationRunner`], which applies plain
//! `.sql` files and records them in a ledger table.

mod sqlite;

pub use sqlite::{SqliteMigrationRunner, LEDGER_TABLE};

use async_trait::async_trait;
use modinstall_errors::Error;
use modinstall_types::{MigrationDescriptor, MigrationTarget};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

/// Lists and applies migrations for a namespace or directory
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Migrations not yet applied, in application order
    ///
    /// Unknown namespaces and missing directories yield an empty list.
    async fn pending_migrations(
        &self,
        target: &MigrationTarget,
    ) -> Result<Vec<MigrationDescriptor>, Error>;

    /// Apply everything pending for `target`, returning how many ran
    async fn apply_pending(&self, target: &MigrationTarget) -> Result<usize, Error>;
}

/// Create a new `SQLite` connection pool
///
/// # Errors
///
/// Returns an error if the database cannot be opened or created.
pub async fn create_pool(db_path: &Path) -> Result<Pool<Sqlite>, Error> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
