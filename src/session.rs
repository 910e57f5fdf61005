//! Session aggregator
//!
//! Turns a finished workout into a persisted session summary, one sub-record
//! per exercise and one instance record per exercise, all in a single batch.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analysis::{aggregate_workout, duration_minutes, local_day_key, ExerciseAggregate};
use crate::error::Result;
use crate::models::{
  ExerciseCount, InstanceRecord, SessionExerciseRecord, SessionSummary, SessionWrite, Workout,
};
use crate::store::{paths, DocumentStore, WriteBatch};

/// ---------------------------------------------------------------------------
/// Document Builders
/// ---------------------------------------------------------------------------

pub(crate) fn build_summary(
  start: DateTime<Utc>,
  end: DateTime<Utc>,
  aggregates: &[ExerciseAggregate<'_>],
) -> SessionSummary {
  SessionSummary {
    start_at: start,
    end_at: end,
    duration_min: duration_minutes(start, end),
    day_key: local_day_key(&start),
    total_completed_sets: aggregates.iter().map(|a| a.completed_set_count).sum(),
    exercise_counts: exercise_counts(aggregates),
  }
}

pub(crate) fn exercise_counts(aggregates: &[ExerciseAggregate<'_>]) -> Vec<ExerciseCount> {
  aggregates
    .iter()
    .map(|agg| ExerciseCount {
      exercise_id: agg.exercise.exercise_id.clone(),
      name: agg.exercise.name.clone(),
      category: agg.exercise.category.clone(),
      completed_set_count: agg.completed_set_count,
      order: agg.order,
    })
    .collect()
}

pub(crate) fn sub_record(agg: &ExerciseAggregate<'_>) -> SessionExerciseRecord {
  SessionExerciseRecord {
    exercise_id: agg.exercise.exercise_id.clone(),
    instance_id: agg.exercise.instance_id.clone(),
    order: agg.order,
    sets: agg.sets.clone(),
    est1rm: agg.best_est_1rm(),
  }
}

pub(crate) fn instance_record(session_id: &str, date: DateTime<Utc>, agg: &ExerciseAggregate<'_>) -> InstanceRecord {
  InstanceRecord {
    session_id: session_id.to_string(),
    exercise_in_session_id: agg.exercise.instance_id.clone(),
    exercise_id: agg.exercise.exercise_id.clone(),
    order: agg.order,
    date,
    completed_set_count: agg.completed_set_count,
    aggregates: agg.aggregates,
  }
}

/// ---------------------------------------------------------------------------
/// Reads
/// ---------------------------------------------------------------------------

pub async fn load_session_summary(
  store: &dyn DocumentStore,
  uid: &str,
  session_id: &str,
) -> Result<Option<SessionSummary>> {
  match store.get(&paths::session(uid, session_id)).await? {
    Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
    None => Ok(None),
  }
}

pub async fn load_session_exercises(
  store: &dyn DocumentStore,
  uid: &str,
  session_id: &str,
) -> Result<Vec<(String, SessionExerciseRecord)>> {
  store
    .get_all(&paths::session_exercises(uid, session_id), Some("order"))
    .await?
    .into_iter()
    .map(|doc| Ok((doc.id, serde_json::from_value(doc.data)?)))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Session Write
/// ---------------------------------------------------------------------------

/// Persist a finished workout.
///
/// A workout without a single completed set writes nothing and comes back with
/// an empty `session_id`.
pub async fn write_session_and_collect_instances(
  store: &dyn DocumentStore,
  uid: &str,
  workout: &Workout,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
) -> Result<SessionWrite> {
  let aggregates = aggregate_workout(workout);

  if aggregates.is_empty() {
    tracing::debug!(uid = %uid, "Workout has no completed sets, skipping session write");
    return Ok(SessionWrite {
      session_id: String::new(),
      date: start,
      instances: Vec::new(),
    });
  }

  let session_id = Uuid::new_v4().to_string();
  let summary = build_summary(start, end, &aggregates);

  let mut batch = WriteBatch::new();
  batch.set(paths::session(uid, &session_id), serde_json::to_value(&summary)?);

  let mut instances = Vec::with_capacity(aggregates.len());
  for agg in &aggregates {
    let exercise = agg.exercise;
    batch.set(
      paths::session_exercise(uid, &session_id, &exercise.instance_id),
      serde_json::to_value(sub_record(agg))?,
    );

    let record = instance_record(&session_id, start, agg);
    batch.set(
      paths::instance(uid, &exercise.exercise_id, &session_id, &exercise.instance_id),
      serde_json::to_value(&record)?,
    );
    instances.push(record);
  }

  store.commit(batch).await?;

  tracing::info!(
    uid = %uid,
    session_id = %session_id,
    exercises = instances.len(),
    total_sets = summary.total_completed_sets,
    "Session written"
  );

  Ok(SessionWrite {
    session_id,
    date: start,
    instances,
  })
}
