//! SQLite pool behind [`SqliteRegistry`](crate::SqliteRegistry).
//!
//! The pool only ever serves the `rfid_tags` table. Opening it does not
//! touch the schema; `Registry::init` applies the embedded migrations.

use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default location of the registry database file.
pub const DEFAULT_DATABASE_PATH: &str = "rfid_tags.db";

/// Connections kept for a file database: the scanner reads while an
/// enrollment writes.
const DEFAULT_POOL_SIZE: u32 = 2;

/// How long a writer waits on SQLite's file lock before giving up.
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Where the registry lives and how many connections may hit it at once.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file, created along with its directory when missing.
    pub path: PathBuf,

    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: DEFAULT_POOL_SIZE,
        }
    }

    /// Set the upper bound on pooled connections (at least one).
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_PATH)
    }
}

/// Handle on the registry's connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the registry file.
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        ensure_parent_dir(&config.path)?;

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(LOCK_WAIT)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        debug!(path = %config.path.display(), "Registry database open");
        Ok(Self { pool })
    }

    /// A private, empty registry that disappears with the handle.
    pub async fn in_memory() -> StorageResult<Self> {
        // Each connection to :memory: would see its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;

        Ok(Self { pool })
    }

    /// Bring the `rfid_tags` schema up to date; a no-op once applied.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for borrowed connections to come back, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => std::fs::create_dir_all(dir)
            .map_err(|e| {
                StorageError::Configuration(format!("cannot create {}: {}", dir.display(), e))
            }),
        _ => Ok(()),
    }
}
