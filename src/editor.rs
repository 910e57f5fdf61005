//! Session editor
//!
//! Reconciles an already persisted session with an edited workout. Only
//! exercises whose completed sets actually changed are rewritten; those, plus
//! any exercise that disappeared from the session, get a full metrics rescan.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::analysis::{aggregate_workout, duration_minutes};
use crate::catalog::CatalogRefresh;
use crate::error::{EngineError, Result};
use crate::metrics::{rescan_exercises, InFlightEdit};
use crate::models::{EditedSession, SessionExerciseRecord, Workout};
use crate::session::{exercise_counts, instance_record, load_session_exercises, load_session_summary, sub_record};
use crate::store::{paths, DocumentStore, WriteBatch};

/// Apply an edited workout to an existing session.
///
/// Returns `None` without writing anything when the edit carries no exercises
/// or no sets.
pub async fn write_edited_session(
  store: &dyn DocumentStore,
  catalog: &dyn CatalogRefresh,
  uid: &str,
  session_id: &str,
  workout: &Workout,
  end: DateTime<Utc>,
) -> Result<Option<EditedSession>> {
  if workout.exercises.is_empty() || workout.sets_by_id.is_empty() {
    tracing::debug!(uid = %uid, session_id = %session_id, "Empty edit payload, nothing to do");
    return Ok(None);
  }

  let summary = load_session_summary(store, uid, session_id)
    .await?
    .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
  let date = summary.start_at;

  let stored: HashMap<String, SessionExerciseRecord> = load_session_exercises(store, uid, session_id)
    .await?
    .into_iter()
    .collect();

  let aggregates = aggregate_workout(workout);
  let mut batch = WriteBatch::new();
  let mut changed: BTreeSet<String> = BTreeSet::new();
  let mut present: HashSet<&str> = HashSet::new();

  for agg in &aggregates {
    let exercise = agg.exercise;
    present.insert(exercise.instance_id.as_str());

    let record = sub_record(agg);
    let sub_path = paths::session_exercise(uid, session_id, &exercise.instance_id);

    match stored.get(&exercise.instance_id) {
      Some(existing) if existing.exercise_id == record.exercise_id && existing.sets == record.sets => {
        // Same sets: only the display position may have moved
        batch.set_merge(
          sub_path,
          json!({
            "exerciseId": record.exercise_id,
            "instanceId": record.instance_id,
            "order": record.order,
          }),
        );
      }
      existing => {
        if let Some(previous) = existing.filter(|prev| prev.exercise_id != exercise.exercise_id) {
          // The instance now points at a different exercise; retire the old record
          batch.delete(paths::instance(uid, &previous.exercise_id, session_id, &exercise.instance_id));
          changed.insert(previous.exercise_id.clone());
        }

        batch.set(sub_path, serde_json::to_value(&record)?);
        batch.set(
          paths::instance(uid, &exercise.exercise_id, session_id, &exercise.instance_id),
          serde_json::to_value(instance_record(session_id, date, agg))?,
        );
        changed.insert(exercise.exercise_id.clone());
      }
    }
  }

  for (instance_id, existing) in &stored {
    if present.contains(instance_id.as_str()) {
      continue;
    }
    batch
      .delete(paths::session_exercise(uid, session_id, instance_id))
      .delete(paths::instance(uid, &existing.exercise_id, session_id, instance_id));
    changed.insert(existing.exercise_id.clone());
  }

  batch.set_merge(
    paths::session(uid, session_id),
    json!({
      "endAt": end,
      "durationMin": duration_minutes(summary.start_at, end),
      "totalCompletedSets": aggregates.iter().map(|a| a.completed_set_count).sum::<u32>(),
      "exerciseCounts": exercise_counts(&aggregates),
    }),
  );

  store.commit(batch).await?;

  let changed: Vec<String> = changed.into_iter().collect();
  let edit = InFlightEdit {
    session_id: session_id.to_string(),
    end_at: end,
  };
  rescan_exercises(store, uid, &changed, Some(&edit)).await?;

  tracing::info!(
    uid = %uid,
    session_id = %session_id,
    changed = ?changed,
    "Edited session written"
  );
  catalog.exercises_changed(uid, &changed);

  Ok(Some(EditedSession { date }))
}

/// Remove a session with all of its sub-records and instance records, then
/// rebuild metrics for every exercise it touched. Returns `false` if the
/// session does not exist.
pub async fn delete_session(
  store: &dyn DocumentStore,
  catalog: &dyn CatalogRefresh,
  uid: &str,
  session_id: &str,
) -> Result<bool> {
  if load_session_summary(store, uid, session_id).await?.is_none() {
    return Ok(false);
  }

  let stored = load_session_exercises(store, uid, session_id).await?;
  let mut batch = WriteBatch::new();
  let mut affected: BTreeSet<String> = BTreeSet::new();

  for (instance_id, existing) in &stored {
    batch
      .delete(paths::session_exercise(uid, session_id, instance_id))
      .delete(paths::instance(uid, &existing.exercise_id, session_id, instance_id));
    affected.insert(existing.exercise_id.clone());
  }
  batch.delete(paths::session(uid, session_id));

  store.commit(batch).await?;

  let affected: Vec<String> = affected.into_iter().collect();
  rescan_exercises(store, uid, &affected, None).await?;

  tracing::info!(uid = %uid, session_id = %session_id, exercises = affected.len(), "Session deleted");
  catalog.exercises_changed(uid, &affected);

  Ok(true)
}
