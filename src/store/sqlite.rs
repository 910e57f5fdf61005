//! SQLite-backed document store
//!
//! Every document is one row keyed by its full path. A batch maps onto one SQL
//! transaction, so a failed write leaves nothing behind.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::{merge_json, paths, Document, DocumentStore, WriteBatch, WriteOp};
use crate::db::DbPool;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
  pool: SqlitePool,
}

impl SqliteDocumentStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  /// Number of stored documents whose path starts with `prefix`
  pub async fn count_under(&self, prefix: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE path LIKE ?1 || '%'")
      .bind(prefix)
      .fetch_one(&self.pool)
      .await?;
    Ok(count)
  }
}

fn parse_data(raw: &str) -> Result<Value> {
  Ok(serde_json::from_str(raw)?)
}

async fn upsert(tx: &mut Transaction<'_, Sqlite>, path: &str, data: &Value) -> Result<()> {
  let (collection, doc_id) = paths::split(path);
  if collection.is_empty() || doc_id.is_empty() {
    return Err(EngineError::Store(format!("Invalid document path: '{}'", path)));
  }
  let body = serde_json::to_string(data)?;

  sqlx::query(
    r#"
    INSERT INTO documents (path, collection, doc_id, data, updated_at)
    VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
    ON CONFLICT(path) DO UPDATE SET
      data = excluded.data,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(path)
  .bind(collection)
  .bind(doc_id)
  .bind(body)
  .execute(&mut **tx)
  .await?;

  Ok(())
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
  async fn get(&self, path: &str) -> Result<Option<Value>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT data FROM documents WHERE path = ?1")
      .bind(path)
      .fetch_optional(&self.pool)
      .await?;

    row.map(|(raw,)| parse_data(&raw)).transpose()
  }

  async fn get_all(&self, collection: &str, order_by: Option<&str>) -> Result<Vec<Document>> {
    let rows = match order_by {
      Some(field) => {
        sqlx::query(
          "SELECT path, doc_id, data FROM documents WHERE collection = ?1 \
           ORDER BY json_extract(data, ?2), doc_id",
        )
        .bind(collection)
        .bind(format!("$.{}", field))
        .fetch_all(&self.pool)
        .await?
      }
      None => {
        sqlx::query("SELECT path, doc_id, data FROM documents WHERE collection = ?1 ORDER BY doc_id")
          .bind(collection)
          .fetch_all(&self.pool)
          .await?
      }
    };

    rows
      .into_iter()
      .map(|row| {
        let raw: String = row.get("data");
        Ok(Document {
          path: row.get("path"),
          id: row.get("doc_id"),
          data: parse_data(&raw)?,
        })
      })
      .collect()
  }

  async fn commit(&self, batch: WriteBatch) -> Result<()> {
    if batch.is_empty() {
      return Ok(());
    }

    let op_count = batch.len();
    let mut tx = self.pool.begin().await?;

    for op in batch.into_ops() {
      match op {
        WriteOp::Set { path, data, merge: false } => {
          upsert(&mut tx, &path, &data).await?;
        }
        WriteOp::Set { path, data, merge: true } => {
          let existing: Option<(String,)> = sqlx::query_as("SELECT data FROM documents WHERE path = ?1")
            .bind(&path)
            .fetch_optional(&mut *tx)
            .await?;

          let merged = match existing {
            Some((raw,)) => {
              let mut current = parse_data(&raw)?;
              merge_json(&mut current, data);
              current
            }
            None => data,
          };
          upsert(&mut tx, &path, &merged).await?;
        }
        WriteOp::Delete { path } => {
          sqlx::query("DELETE FROM documents WHERE path = ?1")
            .bind(&path)
            .execute(&mut *tx)
            .await?;
        }
      }
    }

    tx.commit().await?;
    tracing::debug!(ops = op_count, "Committed write batch");

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn test_set_get_and_merge() {
    let store = crate::test_utils::setup_test_store().await;

    let mut batch = WriteBatch::new();
    batch.set("users/u1/exercises/bench", json!({"name": "Bench", "meta": {"a": 1}}));
    store.commit(batch).await.expect("Should commit");

    let mut batch = WriteBatch::new();
    batch.set_merge("users/u1/exercises/bench", json!({"meta": {"b": 2}}));
    store.commit(batch).await.expect("Should commit merge");

    let doc = store.get("users/u1/exercises/bench").await.expect("Should read");
    assert_eq!(doc, Some(json!({"name": "Bench", "meta": {"a": 1, "b": 2}})));

    assert_eq!(store.get("users/u1/exercises/squat").await.unwrap(), None);

    crate::test_utils::teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_get_all_is_scoped_to_direct_children_and_ordered() {
    let store = crate::test_utils::setup_test_store().await;

    let mut batch = WriteBatch::new();
    batch
      .set("users/u1/sessions/b", json!({"startAt": "2026-02-01T10:00:00Z"}))
      .set("users/u1/sessions/a", json!({"startAt": "2026-03-01T10:00:00Z"}))
      .set("users/u1/sessions/a/exercises/x", json!({"order": 1}));
    store.commit(batch).await.expect("Should commit");

    let docs = store
      .get_all("users/u1/sessions", Some("startAt"))
      .await
      .expect("Should list");
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);

    let children = store.get_all("users/u1/sessions/a/exercises", None).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path, "users/u1/sessions/a/exercises/x");

    crate::test_utils::teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_delete_and_count() {
    let store = crate::test_utils::setup_test_store().await;

    let mut batch = WriteBatch::new();
    batch.set("users/u1/a", json!({})).set("users/u1/b", json!({}));
    store.commit(batch).await.unwrap();
    assert_eq!(store.count_under("users/u1/").await.unwrap(), 2);

    let mut batch = WriteBatch::new();
    batch.delete("users/u1/a").delete("users/u1/missing");
    store.commit(batch).await.unwrap();
    assert_eq!(store.count_under("users/u1/").await.unwrap(), 1);

    crate::test_utils::teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_failed_batch_writes_nothing() {
    let store = crate::test_utils::setup_test_store().await;

    let mut batch = WriteBatch::new();
    batch.set("users/u1/a", json!({"ok": true})).set("orphan", json!({}));
    let err = store.commit(batch).await.unwrap_err();

    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(store.get("users/u1/a").await.unwrap(), None);

    crate::test_utils::teardown_test_store(store).await;
  }
}
