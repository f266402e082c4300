//! Configuration for the document store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operations-per-batch limit of the hosted store
pub const DEFAULT_MAX_BATCH_OPS: usize = 500;

/// Configuration for a document store backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory for collection files (local backend only)
    pub data_dir: PathBuf,

    /// Largest batch the backend accepts
    pub max_batch_ops: usize,

    /// Write collection files as indented JSON
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data"), max_batch_ops: DEFAULT_MAX_BATCH_OPS, pretty: true }
    }
}

impl StoreConfig {
    /// Create a new configuration with custom data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Default::default() }
    }

    /// Path of the file holding one collection
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_ops == 0 {
            return Err("max_batch_ops must be greater than 0".to_string());
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }

        Ok(())
    }
}
