pub mod analysis;
pub mod catalog;
pub mod config;
pub mod db;
pub mod editor;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod progression;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use catalog::{CatalogRefresh, NoopCatalog};
pub use config::EngineConfig;
pub use engine::{Engine, ExerciseMetrics};
pub use error::{EngineError, Result};
pub use progression::{ProgressionItem, ProgressionReport};
pub use store::{DocumentStore, SqliteDocumentStore, WriteBatch};

/// Load configuration from the environment (and `.env`), install logging and
/// open the engine's database
pub async fn bootstrap() -> Result<Engine> {
  let config = EngineConfig::load()?;
  logging::init(&config.log_level);

  let engine = Engine::connect(&config).await?;
  tracing::info!("Engine ready");

  Ok(engine)
}
