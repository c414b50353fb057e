//! Append-only processing log.
//!
//! One row per processed payload: the text, its BLAKE3 hash, the outcome,
//! and the validation counters. Rows are never updated; `clear` wipes the
//! table at session start.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use factgraph_core::{LogEntry, LogStatus, LogStore, PayloadId, StoreError};

use crate::{Result, SqlError, SqliteDatabase};

const CREATE_LOG: &str = "CREATE TABLE IF NOT EXISTS log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payload_id TEXT NOT NULL,
    text TEXT NOT NULL,
    text_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    candidates INTEGER NOT NULL,
    accepted INTEGER NOT NULL,
    rejected INTEGER NOT NULL,
    dropped_properties INTEGER NOT NULL,
    mutations INTEGER NOT NULL,
    error TEXT,
    logged_at TEXT NOT NULL
)";

/// SQLite-backed implementation of [`LogStore`].
#[derive(Clone)]
pub struct SqliteLogStore {
    db: SqliteDatabase,
}

impl SqliteLogStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    pub async fn create_table(&self) -> Result<()> {
        sqlx::query(CREATE_LOG).execute(self.db.pool()).await?;
        Ok(())
    }

    pub async fn insert(&self, entry: &LogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO log (
                payload_id, text, text_hash, status, candidates, accepted,
                rejected, dropped_properties, mutations, error, logged_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.payload_id.0.to_string())
        .bind(&entry.text)
        .bind(&entry.text_hash)
        .bind(entry.status.as_str())
        .bind(entry.candidates as i64)
        .bind(entry.accepted as i64)
        .bind(entry.rejected as i64)
        .bind(entry.dropped_properties as i64)
        .bind(entry.mutations as i64)
        .bind(entry.error.as_deref())
        .bind(entry.logged_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM log")
            .execute(self.db.pool())
            .await?
            .rows_affected();
        Ok(removed)
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT payload_id, text, text_hash, status, candidates, accepted,
                    rejected, dropped_properties, mutations, error, logged_at
             FROM log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LogEntry> {
    let payload_id: String = row.try_get("payload_id")?;
    let payload_id = Uuid::parse_str(&payload_id)
        .map(PayloadId)
        .map_err(|e| SqlError::Corrupt(format!("invalid payload_id: {e}")))?;

    let status: String = row.try_get("status")?;
    let status = match status.as_str() {
        "applied" => LogStatus::Applied,
        "failed" => LogStatus::Failed,
        other => return Err(SqlError::Corrupt(format!("unknown status '{other}'"))),
    };

    let logged_at: String = row.try_get("logged_at")?;
    let logged_at = DateTime::parse_from_rfc3339(&logged_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::Corrupt(format!("invalid logged_at: {e}")))?;

    Ok(LogEntry {
        payload_id,
        text: row.try_get("text")?,
        text_hash: row.try_get("text_hash")?,
        status,
        candidates: count(row, "candidates")?,
        accepted: count(row, "accepted")?,
        rejected: count(row, "rejected")?,
        dropped_properties: count(row, "dropped_properties")?,
        mutations: count(row, "mutations")?,
        error: row.try_get("error")?,
        logged_at,
    })
}

fn count(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<u32> {
    let n: i64 = row.try_get(column)?;
    u32::try_from(n).map_err(|_| SqlError::Corrupt(format!("{column} out of range: {n}")))
}

impl LogStore for SqliteLogStore {
    async fn ensure_table(&self) -> std::result::Result<(), StoreError> {
        self.create_table()
            .await
            .map_err(|e| StoreError::Log(e.to_string()))
    }

    async fn append(&self, entry: &LogEntry) -> std::result::Result<(), StoreError> {
        self.insert(entry)
            .await
            .map_err(|e| StoreError::Log(e.to_string()))
    }

    async fn clear(&self) -> std::result::Result<u64, StoreError> {
        self.delete_all()
            .await
            .map_err(|e| StoreError::Log(e.to_string()))
    }
}
