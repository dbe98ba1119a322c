//! Key/value memory contract used for action audit history.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use momentum_core::error::MomentumError;

/// One stored memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub key: String,
    pub owner: String,
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

/// Owner-scoped key/value store. Writing an existing key replaces it.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        owner: &str,
    ) -> Result<(), MomentumError>;

    async fn fetch(&self, key: &str) -> Result<Option<MemoryRecord>, MomentumError>;

    /// Records for `owner`, oldest first.
    async fn list_for_owner(&self, owner: &str) -> Result<Vec<MemoryRecord>, MomentumError>;
}

/// Process-local store for tests and `--in-memory` runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<MemoryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> MomentumError {
    MomentumError::Storage(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        owner: &str,
    ) -> Result<(), MomentumError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        records.retain(|r| r.key != key);
        records.push(MemoryRecord {
            key: key.to_string(),
            owner: owner.to_string(),
            value,
            stored_at: Utc::now(),
        });
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<MemoryRecord>, MomentumError> {
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records.iter().find(|r| r.key == key).cloned())
    }

    async fn list_for_owner(&self, owner: &str) -> Result<Vec<MemoryRecord>, MomentumError> {
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records.iter().filter(|r| r.owner == owner).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_and_fetch() {
        let store = InMemoryStore::new();
        store
            .store("action_result:1", json!({"status": "completed"}), "alice")
            .await
            .unwrap();

        let record = store.fetch("action_result:1").await.unwrap().unwrap();
        assert_eq!(record.owner, "alice");
        assert_eq!(record.value["status"], "completed");
        assert!(store.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_same_key_replaces() {
        let store = InMemoryStore::new();
        store.store("k", json!(1), "alice").await.unwrap();
        store.store("k", json!(2), "alice").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.fetch("k").await.unwrap().unwrap().value, json!(2));
    }

    #[tokio::test]
    async fn test_list_for_owner_filters_and_keeps_order() {
        let store = InMemoryStore::new();
        store.store("a", json!("first"), "alice").await.unwrap();
        store.store("b", json!("other"), "bob").await.unwrap();
        store.store("c", json!("second"), "alice").await.unwrap();

        let keys: Vec<String> = store
            .list_for_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert!(store.list_for_owner("carol").await.unwrap().is_empty());
    }
}
