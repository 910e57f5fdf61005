//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Store setup/teardown
//! - Mock workout factories
//! - A catalog hook that records notifications
//! - Helper assertions

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::catalog::CatalogRefresh;
use crate::models::{ExerciseInstance, TrackingData, TrackingMethod, Workout, WorkoutSet};
use crate::store::{DocumentStore, SqliteDocumentStore};

/// ---------------------------------------------------------------------------
/// Store Test Utilities
/// ---------------------------------------------------------------------------

/// Create a document store over an in-memory SQLite database
///
/// Uses max_connections(1) so every query sees the same in-memory database
pub async fn setup_test_store() -> SqliteDocumentStore {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  crate::db::run_migrations(&pool)
    .await
    .expect("Failed to run migrations");

  SqliteDocumentStore::new(pool)
}

/// Close a test store's pool
pub async fn teardown_test_store(store: SqliteDocumentStore) {
  store.pool().close().await;
}

/// Read several documents at once, for before/after comparisons
pub async fn snapshot(store: &dyn DocumentStore, paths: &[String]) -> Vec<Option<Value>> {
  let mut docs = Vec::with_capacity(paths.len());
  for path in paths {
    docs.push(store.get(path).await.expect("Failed to read document"));
  }
  docs
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_set(
  id: &str,
  order: u32,
  completed: bool,
  weight: Option<f64>,
  reps: Option<f64>,
  time: Option<f64>,
) -> WorkoutSet {
  WorkoutSet {
    id: id.to_string(),
    order,
    completed,
    tracking_data: TrackingData { weight, reps, time },
  }
}

pub fn mock_exercise(
  instance_id: &str,
  exercise_id: &str,
  methods: &[TrackingMethod],
  set_ids: &[&str],
) -> ExerciseInstance {
  ExerciseInstance {
    instance_id: instance_id.to_string(),
    exercise_id: exercise_id.to_string(),
    name: format!("Exercise {}", exercise_id),
    category: "Strength".to_string(),
    tracking_methods: methods.to_vec(),
    set_ids: set_ids.iter().map(|s| s.to_string()).collect(),
    order: None,
  }
}

/// One-hour workout starting at [`t0`]
pub fn mock_workout(exercises: Vec<(ExerciseInstance, Vec<WorkoutSet>)>) -> Workout {
  mock_workout_at(t0(), exercises)
}

/// One-hour workout starting at `start`
pub fn mock_workout_at(start: DateTime<Utc>, exercises: Vec<(ExerciseInstance, Vec<WorkoutSet>)>) -> Workout {
  let mut sets_by_id = HashMap::new();
  let mut instances = Vec::with_capacity(exercises.len());

  for (exercise, sets) in exercises {
    for set in sets {
      sets_by_id.insert(set.id.clone(), set);
    }
    instances.push(exercise);
  }

  Workout {
    start_time: start,
    end_time: start + Duration::minutes(60),
    exercises: instances,
    sets_by_id,
  }
}

/// Single bench press exercise (instance `i1`) with every set completed
pub fn bench_workout_at(start: DateTime<Utc>, sets: &[(f64, f64)]) -> Workout {
  let ids: Vec<String> = (1..=sets.len()).map(|n| format!("s{}", n)).collect();
  let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

  let mock_sets = sets
    .iter()
    .zip(&ids)
    .enumerate()
    .map(|(i, (&(weight, reps), id))| mock_set(id, i as u32 + 1, true, Some(weight), Some(reps), None))
    .collect();

  mock_workout_at(
    start,
    vec![(
      mock_exercise("i1", "bench", &[TrackingMethod::Weight, TrackingMethod::Reps], &id_refs),
      mock_sets,
    )],
  )
}

/// Catalog hook that remembers every notification
#[derive(Debug, Default)]
pub struct RecordingCatalog {
  calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingCatalog {
  pub fn calls(&self) -> Vec<(String, Vec<String>)> {
    self.calls.lock().expect("catalog lock poisoned").clone()
  }
}

impl CatalogRefresh for RecordingCatalog {
  fn exercises_changed(&self, uid: &str, exercise_ids: &[String]) {
    self
      .calls
      .lock()
      .expect("catalog lock poisoned")
      .push((uid.to_string(), exercise_ids.to_vec()));
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Fixed reference instant so tests don't depend on the wall clock
pub fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_store_creates_schema() {
    let store = setup_test_store().await;

    let tables: Vec<(String,)> =
      sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = 'documents'")
        .fetch_all(store.pool())
        .await
        .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_store(store).await;
  }

  #[test]
  fn test_bench_workout_factory() {
    let workout = bench_workout_at(t0(), &[(135.0, 5.0), (145.0, 3.0)]);

    assert_eq!(workout.exercises.len(), 1);
    assert_eq!(workout.exercises[0].set_ids, vec!["s1", "s2"]);
    assert_eq!(workout.sets_by_id["s2"].order, 2);
    assert_eq!(workout.sets_by_id["s2"].tracking_data.weight, Some(145.0));
    assert_eq!(workout.end_time - workout.start_time, Duration::minutes(60));
    assert!(workout.has_completed_sets());
  }

  #[test]
  fn test_recording_catalog_keeps_calls_in_order() {
    let catalog = RecordingCatalog::default();
    catalog.exercises_changed("u1", &["bench".to_string()]);
    catalog.exercises_changed("u2", &[]);

    assert_eq!(
      catalog.calls(),
      vec![("u1".to_string(), vec!["bench".to_string()]), ("u2".to_string(), vec![])]
    );
  }
}
