//! Composition root: the document store and the catalog hook, injected once
//! and shared by every entry point.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{CatalogRefresh, NoopCatalog};
use crate::config::EngineConfig;
use crate::db;
use crate::editor;
use crate::error::Result;
use crate::metrics;
use crate::models::{AllTimeMetrics, EditedSession, InstanceRecord, LastSessionMetrics, SessionWrite, Workout};
use crate::progression::{self, ProgressionReport};
use crate::session;
use crate::store::{DocumentStore, SqliteDocumentStore};

/// Both stored metrics documents of one exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseMetrics {
  pub last_session: Option<LastSessionMetrics>,
  pub all_time: Option<AllTimeMetrics>,
}

#[derive(Clone)]
pub struct Engine {
  store: Arc<dyn DocumentStore>,
  catalog: Arc<dyn CatalogRefresh>,
}

impl Engine {
  pub fn new(store: Arc<dyn DocumentStore>) -> Self {
    Self {
      store,
      catalog: Arc::new(NoopCatalog),
    }
  }

  pub fn with_catalog(mut self, catalog: Arc<dyn CatalogRefresh>) -> Self {
    self.catalog = catalog;
    self
  }

  /// Open (and migrate) the SQLite database named in `config`
  pub async fn connect(config: &EngineConfig) -> Result<Self> {
    let pool = db::initialize_db(config).await?;
    Ok(Self::new(Arc::new(SqliteDocumentStore::new(pool))))
  }

  pub fn store(&self) -> &dyn DocumentStore {
    self.store.as_ref()
  }

  /// ---------------------------------------------------------------------------
  /// Session Writes
  /// ---------------------------------------------------------------------------

  pub async fn write_session_and_collect_instances(
    &self,
    uid: &str,
    workout: &Workout,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<SessionWrite> {
    session::write_session_and_collect_instances(self.store(), uid, workout, start, end).await
  }

  pub async fn write_exercise_metrics_for_session(&self, uid: &str, workout: &Workout, session_id: &str) -> Result<()> {
    metrics::write_exercise_metrics_for_session(self.store(), self.catalog.as_ref(), uid, workout, session_id).await
  }

  pub async fn write_edited_session(
    &self,
    uid: &str,
    session_id: &str,
    workout: &Workout,
    end: DateTime<Utc>,
  ) -> Result<Option<EditedSession>> {
    editor::write_edited_session(self.store(), self.catalog.as_ref(), uid, session_id, workout, end).await
  }

  pub async fn delete_session(&self, uid: &str, session_id: &str) -> Result<bool> {
    editor::delete_session(self.store(), self.catalog.as_ref(), uid, session_id).await
  }

  /// Rebuild metrics for the given exercises from their stored history
  pub async fn rescan_exercises(&self, uid: &str, exercise_ids: &[String]) -> Result<()> {
    metrics::rescan_exercises(self.store(), uid, exercise_ids, None).await?;
    self.catalog.exercises_changed(uid, exercise_ids);
    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// Reads
  /// ---------------------------------------------------------------------------

  pub async fn calculate_progressions_for_workout(&self, uid: &str, workout: &Workout) -> Result<ProgressionReport> {
    progression::calculate_progressions_for_workout(self.store(), uid, workout).await
  }

  pub async fn load_exercise_metrics(&self, uid: &str, exercise_id: &str) -> Result<ExerciseMetrics> {
    Ok(ExerciseMetrics {
      last_session: metrics::load_last_session_metrics(self.store(), uid, exercise_id).await?,
      all_time: metrics::load_all_time_metrics(self.store(), uid, exercise_id).await?,
    })
  }

  /// Instance records of one exercise, oldest first
  pub async fn load_exercise_history(&self, uid: &str, exercise_id: &str) -> Result<Vec<InstanceRecord>> {
    metrics::load_instance_records(self.store(), uid, exercise_id).await
  }
}
