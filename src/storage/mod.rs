//! Key-Value Storage Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory, filesystem and SQLite without API changes
//! - JSON encoding of persisted records lives here, not in the stores

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StorageResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub mod filesystem;
pub mod memory;
pub mod sqlite;

pub use filesystem::FileSystemStorage;
pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

const SQLITE_FILE: &str = "chat.db";

/// Keys under which chat state is persisted
pub mod keys {
    /// Message list of the active session
    pub const CHAT_HISTORY: &str = "chatHistory";
    /// Active conversation record, re-loaded on the next start
    pub const CURRENT_CONVERSATION: &str = "currentConversation";
    /// Bounded list of saved conversations, most recent first
    pub const CONVERSATIONS: &str = "conversations";
    pub const CONVERSATION_TOPICS: &str = "conversationTopics";
}

/// String key-value store holding serialized chat state
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` if the key has never been written
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;

    async fn keys(&self) -> StorageResult<Vec<String>>;

    async fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Load and decode a JSON value.
///
/// Missing keys, unreadable storage and corrupt JSON all yield `None`; the
/// caller starts from empty state instead of failing.
pub async fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("[Storage] Failed to read '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("[Storage] Discarding corrupt value for '{}': {}", key, e);
            None
        }
    }
}

pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json).await
}

/// Open the backend named in the storage settings
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryStorage::new()),
        StorageBackend::Filesystem => Arc::new(FileSystemStorage::new(config.path.clone()).await?),
        StorageBackend::Sqlite => {
            tokio::fs::create_dir_all(&config.path).await?;
            Arc::new(SqliteStorage::open(config.path.join(SQLITE_FILE))?)
        }
    };

    tracing::debug!(
        "[Storage] Opened {:?} backend at {}",
        config.backend,
        config.path.display()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryStorage;
    use super::*;

    #[tokio::test]
    async fn test_load_json_missing_key() {
        let store = InMemoryStorage::new();
        let value: Option<Vec<String>> = load_json(&store, keys::CONVERSATIONS).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_load_json_corrupt_value_is_none() {
        let store = InMemoryStorage::new();
        store.set(keys::CONVERSATIONS, "{not json").await.unwrap();

        let value: Option<Vec<String>> = load_json(&store, keys::CONVERSATIONS).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_json() {
        let store = InMemoryStorage::new();
        save_json(&store, "list", &vec!["a", "b"]).await.unwrap();

        let value: Option<Vec<String>> = load_json(&store, "list").await;
        assert_eq!(value.unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_open_backend_sqlite_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: dir.path().join("nested"),
        };

        let store = open_backend(&config).await.unwrap();
        store.set(keys::CHAT_HISTORY, "[]").await.unwrap();

        assert!(dir.path().join("nested").join(SQLITE_FILE).exists());
        assert_eq!(store.keys().await.unwrap(), vec![keys::CHAT_HISTORY.to_string()]);
    }
}
