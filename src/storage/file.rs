use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::{Result, SlidetrackError};

/// Single JSON document on disk holding every key
///
/// The whole document is rewritten on each mutation through a temporary file
/// and a rename, so a crash mid-write leaves the previous version intact. The
/// in-memory view only changes once the write has landed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    // A corrupt store must not lock the user out; start clean
                    warn!(path = %path.display(), "Store document unreadable, starting empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(SlidetrackError::storage(format!(
                    "Failed to read store {}: {e}",
                    path.display()
                )))
            }
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("lastActivity", json!(1_700_000_000_000_i64)).await.unwrap();
        store
            .set("processingTasks", json!([{"taskId": "t1", "recordIds": ["a"], "startTime": 1}]))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("lastActivity").await.unwrap(),
            Some(json!(1_700_000_000_000_i64))
        );
        assert!(reopened.get("processingTasks").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set("isAuthenticated", json!(true)).await.unwrap();
        store.remove("isAuthenticated").await.unwrap();
        store.remove("isAuthenticated").await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.get("isAuthenticated").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_previous_value() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        let store = FileStore::open(sub.join("store.json")).await.unwrap();
        store.set("processingTasks", json!([])).await.unwrap();

        // Parent directory replaced by a regular file: every flush fails
        tokio::fs::remove_dir_all(&sub).await.unwrap();
        tokio::fs::write(&sub, b"").await.unwrap();

        let tasks = json!([{"taskId": "t1", "recordIds": ["a"], "startTime": 1}]);
        assert!(store.set("processingTasks", tasks).await.is_err());
        assert_eq!(store.get("processingTasks").await.unwrap(), Some(json!([])));

        assert!(store.remove("processingTasks").await.is_err());
        assert_eq!(store.get("processingTasks").await.unwrap(), Some(json!([])));

        assert!(store.set("lastActivity", json!(1)).await.is_err());
        assert!(store.get("lastActivity").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_document_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(store.get("lastActivity").await.unwrap().is_none());
        assert_eq!(store.path(), path.as_path());
    }
}
