//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use momentum_core::error::MomentumError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MomentumError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| MomentumError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MomentumError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: memories");
    }

    Ok(())
}

/// Version 1: key/value memory table written by the planner.
fn apply_v1(conn: &Connection) -> Result<(), MomentumError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memories (
            key         TEXT PRIMARY KEY NOT NULL,
            owner       TEXT NOT NULL,
            value       TEXT NOT NULL,
            stored_at   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_memories_owner
            ON memories (owner, stored_at);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'memories');
        ",
    )
    .map_err(|e| MomentumError::Storage(format!("Migration v1 failed: {}", e)))
}
