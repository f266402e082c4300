//! # League Store
//!
//! The boundary between the recalculation engine and the document database
//! that holds league data.
//!
//! ## Architecture
//!
//! - **DocumentStore**: Abstract trait over collection reads and batched writes
//! - **WriteBatch**: Ordered upserts (replace or merge) and deletes, capped per backend
//! - **InMemoryStore**: Process-local backend for tests and embedding
//! - **LocalStore**: One JSON file per collection under a data directory
//!
//! ## Usage
//!
//! ```rust
//! use league_store::{create_local_store, DocumentStore, WriteBatch};
//! use serde_json::json;
//! use tempfile::TempDir;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let temp_dir = TempDir::new()?;
//!     let mut store = create_local_store(temp_dir.path())?;
//!     store.initialize().await?;
//!
//!     let mut batch = WriteBatch::new();
//!     batch.upsert("teams", "ars", json!({"name": "Arsenal"}));
//!     store.commit(batch).await?;
//!
//!     assert_eq!(store.fetch_all("teams").await?.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod local;

pub use backend::{DocumentStore, InMemoryStore};
pub use batch::{empty_object, CollectionData, Document, WriteBatch, WriteOp};
pub use config::{StoreConfig, DEFAULT_MAX_BATCH_OPS};
pub use error::{Result, StoreError};
pub use local::{create_local_store, create_local_store_with_config, LocalStore};
