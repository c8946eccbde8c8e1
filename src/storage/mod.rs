//! # Durable Key-Value Store
//!
//! The persistence boundary shared by the session manager and the task
//! registry. Values are structured JSON documents; there is no transactional
//! isolation and the last write to a key wins.
//!
//! - [`MemoryStore`] lives as long as the process (tests, ephemeral hosts)
//! - [`FileStore`] keeps a single JSON document on disk and survives restarts

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Origin-scoped durable store with `get/set/remove` semantics
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Typed access on top of any [`KeyValueStore`]
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    async fn get_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_as<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Build the store selected by configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => Ok(Arc::new(FileStore::open(config.resolved_path()).await?)),
    }
}
