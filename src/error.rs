//! Error types for the metrics engine

use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Malformed document: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("Session not found: {0}")]
  SessionNotFound(String),

  #[error("Document store error: {0}")]
  Store(String),
}

impl Serialize for EngineError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type Result<T> = std::result::Result<T, EngineError>;
