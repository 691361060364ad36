//! In-Memory Key-Value Storage
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::KeyValueStore;
use crate::error::StorageResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage using HashMap
/// Data is lost when process terminates
#[derive(Clone)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        tracing::debug!("[InMemoryStorage] Stored {} bytes under '{}'", value.len(), key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        tracing::debug!("[InMemoryStorage] Removed '{}'", key);
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }

    async fn contains(&self, key: &str) -> StorageResult<bool> {
        let entries = self.entries.read().await;
        Ok(entries.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let storage = InMemoryStorage::new();
        storage.set("conversations", "[]").await.unwrap();

        assert_eq!(storage.get("conversations").await.unwrap().as_deref(), Some("[]"));
        assert!(storage.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let storage = InMemoryStorage::new();
        storage.set("chatHistory", "[]").await.unwrap();
        assert!(storage.contains("chatHistory").await.unwrap());

        storage.remove("chatHistory").await.unwrap();
        assert!(!storage.contains("chatHistory").await.unwrap());
        storage.remove("chatHistory").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let storage = InMemoryStorage::new();
        let other = storage.clone();
        storage.set("k", "v").await.unwrap();

        assert_eq!(other.keys().await.unwrap(), vec!["k".to_string()]);
    }
}
