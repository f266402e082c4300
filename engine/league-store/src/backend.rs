//! Document store trait and the in-memory backend

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::batch::{apply_op, to_documents, CollectionData, Document, WriteBatch};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Abstract trait for document store backends
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Prepare the backend for use
    async fn initialize(&mut self) -> Result<()>;

    /// Every document of a collection, ordered by id. Missing collections are empty.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Apply a batch. Batches above [`DocumentStore::max_batch_ops`] are rejected.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Largest batch the backend accepts
    fn max_batch_ops(&self) -> usize;
}

pub(crate) fn check_batch_size(batch: &WriteBatch, limit: usize) -> Result<()> {
    if batch.len() > limit {
        return Err(StoreError::BatchTooLarge { ops: batch.len(), limit });
    }
    Ok(())
}

/// In-memory document store (tests and embedding)
pub struct InMemoryStore {
    config: StoreConfig,
    collections: Arc<Mutex<BTreeMap<String, CollectionData>>>,
    commits: AtomicUsize,
    fail_after_commits: Option<usize>,
    initialized: bool,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            collections: Arc::new(Mutex::new(BTreeMap::new())),
            commits: AtomicUsize::new(0),
            fail_after_commits: None,
            initialized: false,
        }
    }

    /// Create a new in-memory store with default config
    pub fn with_default_config() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Make every commit after the first `commits` fail with a backend error
    pub fn fail_after(mut self, commits: usize) -> Self {
        self.fail_after_commits = Some(commits);
        self
    }

    /// Write a document directly, bypassing batches
    pub async fn insert(&self, collection: &str, id: impl Into<String>, data: Value) {
        let mut collections = self.collections.lock().await;
        collections.entry(collection.to_string()).or_default().insert(id.into(), data);
    }

    /// Current body of one document
    pub async fn get(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.collections.lock().await;
        collections.get(collection)?.get(id).cloned()
    }

    /// Copy of a whole collection
    pub async fn snapshot(&self, collection: &str) -> CollectionData {
        let collections = self.collections.lock().await;
        collections.get(collection).cloned().unwrap_or_default()
    }

    /// Number of batches successfully committed
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.config.validate().map_err(StoreError::config)?;
        self.initialized = true;

        tracing::info!("In-memory document store initialized");

        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }

        let collections = self.collections.lock().await;
        Ok(collections.get(collection).map(to_documents).unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        check_batch_size(&batch, self.config.max_batch_ops)?;

        if let Some(limit) = self.fail_after_commits {
            if self.commits.load(Ordering::SeqCst) >= limit {
                return Err(StoreError::backend(format!(
                    "injected failure after {limit} commits"
                )));
            }
        }

        let mut collections = self.collections.lock().await;
        for op in batch.into_ops() {
            let collection = collections.entry(op.collection().to_string()).or_default();
            apply_op(collection, op);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    fn max_batch_ops(&self) -> usize {
        self.config.max_batch_ops
    }
}
