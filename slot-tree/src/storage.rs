//! Blob persistence for slot and visibility configuration.
//!
//! The host decides where configuration lives. This module only requires a
//! "load blob / save blob" capability keyed by a string, and provides two
//! implementations: an in-memory map and a directory of JSON files.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Error types for blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Key cannot be mapped onto the backing store
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backing store refused or failed the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host-provided key/value storage for configuration blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Load the blob stored under `key`, or `None` if nothing was saved yet.
    async fn load_blob(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Replace the blob stored under `key`.
    async fn save_blob(&self, key: &str, blob: &serde_json::Value) -> Result<(), StorageError>;
}

/// In-memory blob store.
///
/// Cloning shares the underlying map, so a test can keep a handle and inspect
/// what a manager persisted.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing blob.
    pub async fn insert(&self, key: impl Into<String>, blob: serde_json::Value) {
        let mut blobs = self.blobs.write().await;
        blobs.insert(key.into(), blob);
    }

    /// Current blob under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let blobs = self.blobs.read().await;
        blobs.get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load_blob(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.get(key).await)
    }

    async fn save_blob(&self, key: &str, blob: &serde_json::Value) -> Result<(), StorageError> {
        self.insert(key, blob.clone()).await;
        Ok(())
    }
}

/// Blob store backed by one JSON file per key.
///
/// Files are written to a temporary sibling and renamed into place, so a
/// crash mid-write leaves the previous blob readable.
pub struct JsonFileBlobStore {
    /// Directory holding `<key>.json` files
    root_dir: PathBuf,
}

impl JsonFileBlobStore {
    /// Open a store rooted at `root_dir`, creating the directory if needed.
    pub async fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self, StorageError> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "Opened JSON blob store");

        Ok(Self { root_dir })
    }

    /// Directory this store writes into.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root_dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl BlobStore for JsonFileBlobStore {
    async fn load_blob(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.blob_path(key)?;
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let blob = serde_json::from_slice(&content)?;
        debug!(key = %key, path = %path.display(), "Loaded blob");
        Ok(Some(blob))
    }

    async fn save_blob(&self, key: &str, blob: &serde_json::Value) -> Result<(), StorageError> {
        let path = self.blob_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_vec_pretty(blob)?;
        fs::write(&tmp_path, &content).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!(key = %key, size = content.len(), "Saved blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert!(store.load_blob("slots").await.unwrap().is_none());

        store.save_blob("slots", &json!({ "slots": [] })).await.unwrap();

        let loaded = store.load_blob("slots").await.unwrap().unwrap();
        assert_eq!(loaded, json!({ "slots": [] }));
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryBlobStore::new();
        let handle = store.clone();

        store.save_blob("k", &json!(1)).await.unwrap();
        assert_eq!(handle.get("k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_file_store_missing_key_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileBlobStore::new(temp_dir.path()).await.unwrap();

        assert!(store.load_blob("visibility").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileBlobStore::new(temp_dir.path()).await.unwrap();

        store.save_blob("visibility", &json!({ "v": 1 })).await.unwrap();
        store.save_blob("visibility", &json!({ "v": 2 })).await.unwrap();

        let loaded = store.load_blob("visibility").await.unwrap().unwrap();
        assert_eq!(loaded["v"], 2);
        assert!(temp_dir.path().join("visibility.json").exists());
        assert!(!temp_dir.path().join("visibility.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileBlobStore::new(temp_dir.path()).await.unwrap();

        let result = store.save_blob("../escape", &json!({})).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        let result = store.load_blob("").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_blob_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileBlobStore::new(temp_dir.path()).await.unwrap();
        std::fs::write(temp_dir.path().join("slots.json"), b"{not json").unwrap();

        let result = store.load_blob("slots").await;
        assert!(matches!(result, Err(StorageError::Json(_))));
    }
}
