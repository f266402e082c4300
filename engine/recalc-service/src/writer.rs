//! Chunked batch commits

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use league_store::{DocumentStore, WriteBatch, WriteOp};

use crate::error::Result;
use crate::progress::ProgressReporter;

/// Totals of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub batches: usize,
    pub upserts: usize,
    pub deletes: usize,
}

/// Queues writes and commits them sequentially in batches of at most
/// `chunk_size` operations.
pub struct BatchWriter {
    store: Arc<dyn DocumentStore>,
    chunk_size: usize,
    progress_every: usize,
    pending: Vec<WriteOp>,
}

impl BatchWriter {
    /// `batch_size` is capped by the store's own limit
    pub fn new(store: Arc<dyn DocumentStore>, batch_size: usize, progress_every: usize) -> Self {
        let chunk_size = batch_size.min(store.max_batch_ops()).max(1);
        Self { store, chunk_size, progress_every: progress_every.max(1), pending: Vec::new() }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn upsert(&mut self, collection: &str, id: impl Into<String>, data: Value) {
        self.pending.push(WriteOp::Upsert {
            collection: collection.to_string(),
            id: id.into(),
            data,
            merge: false,
        });
    }

    pub fn merge(&mut self, collection: &str, id: impl Into<String>, data: Value) {
        self.pending.push(WriteOp::Upsert {
            collection: collection.to_string(),
            id: id.into(),
            data,
            merge: true,
        });
    }

    pub fn delete(&mut self, collection: &str, id: impl Into<String>) {
        self.pending.push(WriteOp::Delete { collection: collection.to_string(), id: id.into() });
    }

    /// Commit everything queued, one batch at a time.
    ///
    /// On error the batches already committed stay in place and the rest of
    /// the queue is dropped.
    pub async fn flush(&mut self, progress: &dyn ProgressReporter) -> Result<FlushStats> {
        let ops = std::mem::take(&mut self.pending);
        let total_batches = ops.len().div_ceil(self.chunk_size);
        let mut stats = FlushStats::default();

        let mut ops = ops.into_iter().peekable();
        while ops.peek().is_some() {
            let chunk: Vec<WriteOp> = ops.by_ref().take(self.chunk_size).collect();
            let (upserts, deletes) = chunk.iter().fold((0, 0), |(u, d), op| match op {
                WriteOp::Upsert { .. } => (u + 1, d),
                WriteOp::Delete { .. } => (u, d + 1),
            });

            self.store.commit(WriteBatch::from(chunk)).await?;

            stats.batches += 1;
            stats.upserts += upserts;
            stats.deletes += deletes;
            debug!("Committed batch {}/{} ({} ops)", stats.batches, total_batches, upserts + deletes);

            if stats.batches % self.progress_every == 0 && stats.batches < total_batches {
                progress.report(&format!("Committed {} of {} batches", stats.batches, total_batches));
            }
        }

        Ok(stats)
    }
}
