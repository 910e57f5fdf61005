//! Document store seam
//!
//! The engine only needs keyed JSON documents addressed by slash-separated
//! paths, collection listing, and an all-or-nothing write batch. Anything that
//! can provide those three operations can back the engine.

pub mod paths;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use sqlite::SqliteDocumentStore;

/// A stored document together with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub path: String,
  pub id: String,
  pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
  Set { path: String, data: Value, merge: bool },
  Delete { path: String },
}

/// Ordered list of writes applied atomically by [`DocumentStore::commit`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
  ops: Vec<WriteOp>,
}

impl WriteBatch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the document at `path`
  pub fn set(&mut self, path: impl Into<String>, data: Value) -> &mut Self {
    self.ops.push(WriteOp::Set {
      path: path.into(),
      data,
      merge: false,
    });
    self
  }

  /// Merge `data` into the document at `path`, creating it if missing
  pub fn set_merge(&mut self, path: impl Into<String>, data: Value) -> &mut Self {
    self.ops.push(WriteOp::Set {
      path: path.into(),
      data,
      merge: true,
    });
    self
  }

  pub fn delete(&mut self, path: impl Into<String>) -> &mut Self {
    self.ops.push(WriteOp::Delete { path: path.into() });
    self
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn into_ops(self) -> Vec<WriteOp> {
    self.ops
  }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// Fetch a single document, `None` when absent
  async fn get(&self, path: &str) -> Result<Option<Value>>;

  /// List the documents directly inside `collection`, optionally ordered by a
  /// top-level field
  async fn get_all(&self, collection: &str, order_by: Option<&str>) -> Result<Vec<Document>>;

  /// Apply every write in the batch or none of them
  async fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// Recursively merge `patch` into `target`. Nested objects merge key by key;
/// every other value (arrays included) replaces what was there.
pub fn merge_json(target: &mut Value, patch: Value) {
  match (target, patch) {
    (Value::Object(existing), Value::Object(incoming)) => {
      for (key, value) in incoming {
        match existing.get_mut(&key) {
          Some(slot) if slot.is_object() && value.is_object() => merge_json(slot, value),
          _ => {
            existing.insert(key, value);
          }
        }
      }
    }
    (slot, value) => *slot = value,
  }
}
