use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::KeyValueStore;
use crate::error::Result;

/// In-process store backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new();
        store.set("lastActivity", json!(1)).await.unwrap();
        store.set("lastActivity", json!(2)).await.unwrap();
        assert_eq!(store.get("lastActivity").await.unwrap(), Some(json!(2)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_noop() {
        let store = MemoryStore::new();
        store.remove("never-set").await.unwrap();
        assert!(store.is_empty());
    }
}
