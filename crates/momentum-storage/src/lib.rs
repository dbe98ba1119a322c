//! Momentum storage crate - audit memory for finished actions.
//!
//! Provides the `MemoryStore` key/value contract the planner writes action
//! snapshots to, with an in-memory implementation and a WAL-mode SQLite one.

pub mod db;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use db::Database;
pub use memory::{InMemoryStore, MemoryRecord, MemoryStore};
pub use sqlite::SqliteMemoryStore;
