//! SQLite-backed memory store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;

use momentum_core::error::MomentumError;

use crate::db::Database;
use crate::memory::{MemoryRecord, MemoryStore};

/// Persists memories in the `memories` table.
pub struct SqliteMemoryStore {
    db: Arc<Database>,
}

impl SqliteMemoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Run a connection closure on a blocking thread; rusqlite calls never
    /// execute on a runtime worker.
    async fn blocking<F, T>(&self, f: F) -> Result<T, MomentumError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, MomentumError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| MomentumError::Storage(format!("Database task panicked: {}", e)))?
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_record(
    (key, owner, value, stored_at): (String, String, String, i64),
) -> Result<MemoryRecord, MomentumError> {
    let stored_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(stored_at)
        .single()
        .unwrap_or_default();
    Ok(MemoryRecord {
        key,
        owner,
        value: serde_json::from_str(&value)?,
        stored_at,
    })
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        owner: &str,
    ) -> Result<(), MomentumError> {
        let encoded = serde_json::to_string(&value)?;
        let key = key.to_string();
        let owner = owner.to_string();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO memories (key, owner, value, stored_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    owner = excluded.owner,
                    value = excluded.value,
                    stored_at = excluded.stored_at",
                rusqlite::params![key, owner, encoded, Utc::now().timestamp_millis()],
            )
            .map_err(|e| MomentumError::Storage(format!("Failed to store memory: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn fetch(&self, key: &str) -> Result<Option<MemoryRecord>, MomentumError> {
        let key = key.to_string();
        let row = self.blocking(move |conn| {
            conn.query_row(
                "SELECT key, owner, value, stored_at FROM memories WHERE key = ?1",
                rusqlite::params![key],
                row_to_record,
            )
            .optional()
            .map_err(|e| MomentumError::Storage(e.to_string()))
        })
        .await?;
        row.map(into_record).transpose()
    }

    async fn list_for_owner(&self, owner: &str) -> Result<Vec<MemoryRecord>, MomentumError> {
        let owner = owner.to_string();
        let rows = self.blocking(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT key, owner, value, stored_at FROM memories
                     WHERE owner = ?1
                     ORDER BY stored_at ASC, rowid ASC",
                )
                .map_err(|e| MomentumError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![owner], row_to_record)
                .map_err(|e| MomentumError::Storage(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| MomentumError::Storage(e.to_string()))?);
            }
            Ok(out)
        })
        .await?;
        rows.into_iter().map(into_record).collect()
    }
}
