//! Documents and write batches

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A stored document: its id plus the JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), data }
    }
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace a document. With `merge`, top-level fields are
    /// overlaid onto the existing body instead.
    Upsert { collection: String, id: String, data: Value, merge: bool },
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Upsert { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// Ordered group of writes committed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, collection: &str, id: impl Into<String>, data: Value) -> &mut Self {
        self.ops.push(WriteOp::Upsert {
            collection: collection.to_string(),
            id: id.into(),
            data,
            merge: false,
        });
        self
    }

    pub fn merge(&mut self, collection: &str, id: impl Into<String>, data: Value) -> &mut Self {
        self.ops.push(WriteOp::Upsert {
            collection: collection.to_string(),
            id: id.into(),
            data,
            merge: true,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete { collection: collection.to_string(), id: id.into() });
        self
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

impl From<Vec<WriteOp>> for WriteBatch {
    fn from(ops: Vec<WriteOp>) -> Self {
        Self { ops }
    }
}

/// Documents of one collection keyed by id
pub type CollectionData = BTreeMap<String, Value>;

/// Apply one write to a collection held in memory
pub(crate) fn apply_op(collection: &mut CollectionData, op: WriteOp) {
    match op {
        WriteOp::Upsert { id, data, merge: true, .. } => match collection.get_mut(&id) {
            Some(Value::Object(existing)) => {
                if let Value::Object(fields) = data {
                    existing.extend(fields);
                } else {
                    collection.insert(id, data);
                }
            }
            _ => {
                collection.insert(id, data);
            }
        },
        WriteOp::Upsert { id, data, merge: false, .. } => {
            collection.insert(id, data);
        }
        WriteOp::Delete { id, .. } => {
            collection.remove(&id);
        }
    }
}

/// Turn a stored collection into documents, ordered by id
pub(crate) fn to_documents(collection: &CollectionData) -> Vec<Document> {
    collection.iter().map(|(id, data)| Document::new(id.clone(), data.clone())).collect()
}

/// Empty JSON object
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overlays_top_level_fields() {
        let mut collection = CollectionData::new();
        collection.insert("u1".into(), json!({"name": "Ann", "firsts": 2, "score": 10}));

        apply_op(
            &mut collection,
            WriteOp::Upsert {
                collection: "users".into(),
                id: "u1".into(),
                data: json!({"score": 42, "rank": 1}),
                merge: true,
            },
        );

        assert_eq!(collection["u1"], json!({"name": "Ann", "firsts": 2, "score": 42, "rank": 1}));
    }

    #[test]
    fn test_upsert_replaces_and_delete_removes() {
        let mut collection = CollectionData::new();
        collection.insert("a".into(), json!({"x": 1, "y": 2}));

        apply_op(
            &mut collection,
            WriteOp::Upsert { collection: "c".into(), id: "a".into(), data: json!({"x": 3}), merge: false },
        );
        assert_eq!(collection["a"], json!({"x": 3}));

        apply_op(&mut collection, WriteOp::Delete { collection: "c".into(), id: "a".into() });
        assert!(collection.is_empty());
    }

    #[test]
    fn test_batch_builder() {
        let mut batch = WriteBatch::new();
        batch.upsert("teams", "ars", json!({})).merge("users", "u1", empty_object()).delete("standings", "ars");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.ops()[2].collection(), "standings");
    }
}
