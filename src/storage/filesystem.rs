//! File System Key-Value Storage
//!
//! Information Hiding:
//! - File paths and layout hidden from users
//! - Directory structure management hidden behind interface
//! - Persistence mechanism independent of storage trait users

use super::KeyValueStore;
use crate::error::StorageResult;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// File system storage - each key is a JSON file
/// Files are stored as {base_path}/{key}.json
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    pub async fn new(base_path: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileSystemStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_path(key);

        if !fs::try_exists(&path).await? {
            tracing::debug!("[FileSystemStorage] Key '{}' does not exist", key);
            return Ok(None);
        }

        let value = fs::read_to_string(&path).await?;
        tracing::debug!("[FileSystemStorage] Read '{}' from {:?}", key, path);
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        // Readers only ever see a complete file
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!("[FileSystemStorage] Wrote {} bytes for '{}' to {:?}", value.len(), key, path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key);

        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
            tracing::debug!("[FileSystemStorage] Deleted '{}' at {:?}", key, path);
        } else {
            tracing::debug!("[FileSystemStorage] Key '{}' does not exist, nothing to delete", key);
        }

        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(key) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(key.to_string());
                }
            }
        }

        tracing::debug!("[FileSystemStorage] Listed {} keys", keys.len());
        Ok(keys)
    }
}
