//! factgraph-sql: SQLite side of the fact store.
//!
//! Two collaborators share one database file:
//! - [`SqliteMirror`], a relational mirror of the fact graph
//!   (`entities`, `relationships`, `properties`)
//! - [`SqliteLogStore`], the append-only `log` of processed payloads
//!
//! SQLite allows a single writer, so the pool holds one long-lived
//! connection (which also keeps `sqlite::memory:` databases alive).

pub mod hash;
pub mod log;
pub mod mirror;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub use log::SqliteLogStore;
pub use mirror::SqliteMirror;

/// Errors from the SQLite stores.
#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, SqlError>;

/// Shared SQLite connection pool.
///
/// Clone is cheap; hand one clone to each store.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect using a sqlx URL such as `sqlite::memory:` or
    /// `sqlite://data/demo.sqlite`.
    pub async fn connect(url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        tracing::info!(url = %url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Open (creating if needed) a database file, including parent dirs.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::connect(&format!("sqlite://{}", path.display())).await
    }

    /// In-memory database that lives as long as the pool.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_path_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users").join("demo.sqlite");

        let db = SqliteDatabase::open_path(&path).await.unwrap();
        let one: (i64,) = sqlx::query_as("SELECT 1").fetch_one(db.pool()).await.unwrap();

        assert_eq!(one.0, 1);
        assert!(path.exists());
    }
}
