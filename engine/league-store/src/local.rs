//! Local file-based document store
//!
//! Each collection lives in `<data_dir>/<collection>.json` as a single JSON
//! object mapping document ids to bodies. Files are replaced through a
//! temporary file and a rename, so a crash leaves either the old or the new
//! contents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::backend::{check_batch_size, DocumentStore};
use crate::batch::{apply_op, to_documents, CollectionData, Document, WriteBatch, WriteOp};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

pub struct LocalStore {
    config: StoreConfig,
    write_lock: Mutex<()>,
    initialized: bool,
}

impl LocalStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::config)?;
        Ok(Self { config, write_lock: Mutex::new(()), initialized: false })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.config.data_dir
    }

    async fn load(&self, collection: &str) -> Result<CollectionData> {
        read_collection(&self.config.collection_path(collection)).await
    }

    async fn save(&self, collection: &str, data: &CollectionData) -> Result<()> {
        let path = self.config.collection_path(collection);
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

async fn read_collection(path: &Path) -> Result<CollectionData> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(CollectionData::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionData::new()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for LocalStore {
    async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.data_dir).await?;
        self.initialized = true;

        tracing::info!("Local document store initialized at: {:?}", self.config.data_dir);

        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }

        let data = self.load(collection).await?;
        Ok(to_documents(&data))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        check_batch_size(&batch, self.config.max_batch_ops)?;
        if batch.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let mut grouped: BTreeMap<String, Vec<WriteOp>> = BTreeMap::new();
        for op in batch.into_ops() {
            grouped.entry(op.collection().to_string()).or_default().push(op);
        }

        for (collection, ops) in grouped {
            let mut data = self.load(&collection).await?;
            for op in ops {
                apply_op(&mut data, op);
            }
            self.save(&collection, &data).await?;
        }

        Ok(())
    }

    fn max_batch_ops(&self) -> usize {
        self.config.max_batch_ops
    }
}

/// Create a new local store with default configuration
pub fn create_local_store(data_dir: impl Into<PathBuf>) -> Result<LocalStore> {
    LocalStore::new(StoreConfig::new(data_dir))
}

/// Create a new local store with custom configuration
pub fn create_local_store_with_config(config: StoreConfig) -> Result<LocalStore> {
    LocalStore::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn initialized_store(dir: &TempDir) -> LocalStore {
        let mut store = create_local_store(dir.path()).unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialization_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested");

        let mut store = create_local_store(&data_dir).unwrap();
        store.initialize().await.unwrap();
        assert!(store.data_dir().exists());
    }

    #[tokio::test]
    async fn test_commit_persists_to_collection_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = initialized_store(&temp_dir).await;

        let mut batch = WriteBatch::new();
        batch.upsert("users", "u1", json!({"name": "Ann", "firsts": 1}));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.merge("users", "u1", json!({"score": 55}));
        store.commit(batch).await.unwrap();

        // A fresh handle reads the same file.
        let reopened = initialized_store(&temp_dir).await;
        let docs = reopened.fetch_all("users").await.unwrap();
        assert_eq!(docs, vec![Document::new("u1", json!({"name": "Ann", "firsts": 1, "score": 55}))]);
        assert!(temp_dir.path().join("users.json").exists());
    }

    #[tokio::test]
    async fn test_delete_across_collections() {
        let temp_dir = TempDir::new().unwrap();
        let store = initialized_store(&temp_dir).await;

        let mut batch = WriteBatch::new();
        batch.upsert("standings", "a", json!({})).upsert("standings", "b", json!({})).upsert("winnings", "u1", json!({}));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("standings", "a").delete("winnings", "u1");
        store.commit(batch).await.unwrap();

        assert_eq!(store.fetch_all("standings").await.unwrap().len(), 1);
        assert!(store.fetch_all("winnings").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("teams.json"), b"not json").unwrap();
        let store = initialized_store(&temp_dir).await;

        assert!(matches!(store.fetch_all("teams").await, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_uninitialized_store_rejects_reads() {
        let temp_dir = TempDir::new().unwrap();
        let store = create_local_store(temp_dir.path()).unwrap();
        assert!(matches!(store.fetch_all("teams").await, Err(StoreError::NotInitialized)));
    }
}
