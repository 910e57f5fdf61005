//! Metrics updater
//!
//! Keeps each exercise's `lastSessionMetrics` and `allTimeMetrics` documents in
//! step with its instance records. New sessions are merged incrementally; edits
//! and deletions rebuild from every stored record because an incremental merge
//! cannot take back a stale maximum or a stale "last session" pointer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::analysis::aggregate_workout;
use crate::catalog::CatalogRefresh;
use crate::error::{EngineError, Result};
use crate::models::{AllTimeMetrics, InstanceRecord, LastSessionMetrics, Workout};
use crate::session::{instance_record, load_session_summary};
use crate::store::{paths, DocumentStore, WriteBatch};

/// The session currently being edited, if a rescan was triggered by an edit
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightEdit {
  pub session_id: String,
  pub end_at: DateTime<Utc>,
}

/// Metrics rebuilt from an exercise's full history
#[derive(Debug, Clone, PartialEq)]
pub struct RebuiltMetrics {
  pub last_session: LastSessionMetrics,
  pub all_time: AllTimeMetrics,
  pub last_performed_at: DateTime<Utc>,
}

/// ---------------------------------------------------------------------------
/// Reads
/// ---------------------------------------------------------------------------

pub async fn load_last_session_metrics(
  store: &dyn DocumentStore,
  uid: &str,
  exercise_id: &str,
) -> Result<Option<LastSessionMetrics>> {
  match store.get(&paths::last_session_metrics(uid, exercise_id)).await? {
    Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
    None => Ok(None),
  }
}

pub async fn load_all_time_metrics(
  store: &dyn DocumentStore,
  uid: &str,
  exercise_id: &str,
) -> Result<Option<AllTimeMetrics>> {
  match store.get(&paths::all_time_metrics(uid, exercise_id)).await? {
    Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
    None => Ok(None),
  }
}

/// Every instance record of an exercise, oldest first
pub async fn load_instance_records(
  store: &dyn DocumentStore,
  uid: &str,
  exercise_id: &str,
) -> Result<Vec<InstanceRecord>> {
  let docs = store.get_all(&paths::instances(uid, exercise_id), Some("date")).await?;

  let mut records = docs
    .iter()
    .map(|doc| InstanceRecord::from_document(&doc.data))
    .collect::<Result<Vec<_>>>()?;

  records.sort_by(|a, b| {
    a.date
      .cmp(&b.date)
      .then_with(|| a.session_id.cmp(&b.session_id))
      .then_with(|| a.order.cmp(&b.order))
      .then_with(|| a.exercise_in_session_id.cmp(&b.exercise_in_session_id))
  });
  Ok(records)
}

/// Recency order of instance records: date, then the session being edited,
/// then session id, then position within the session
fn recency_key<'a>(
  record: &'a InstanceRecord,
  edit: Option<&InFlightEdit>,
) -> (DateTime<Utc>, bool, &'a str, u32, &'a str) {
  let edited = edit.is_some_and(|e| e.session_id == record.session_id);
  (
    record.date,
    edited,
    record.session_id.as_str(),
    record.order,
    record.exercise_in_session_id.as_str(),
  )
}

/// The record that backs `lastSessionMetrics`. Both the incremental and the
/// rescan path pick it here, so an exercise logged twice in one session
/// resolves to the same instance either way.
pub fn latest_record<'a>(
  records: impl IntoIterator<Item = &'a InstanceRecord>,
  edit: Option<&InFlightEdit>,
) -> Option<&'a InstanceRecord> {
  records
    .into_iter()
    .max_by(|a, b| recency_key(a, edit).cmp(&recency_key(b, edit)))
}

/// ---------------------------------------------------------------------------
/// Incremental Mode
/// ---------------------------------------------------------------------------

/// Fold a freshly written session into each exercise's stored metrics.
///
/// Dates come from the persisted session summary, so the result matches what
/// a rescan of the stored instance records produces. The last-session batch and the all-time batch are committed one after the
/// other; a failure between them leaves last-session metrics ahead of the
/// all-time ones until the exercise is rescanned.
pub async fn write_exercise_metrics_for_session(
  store: &dyn DocumentStore,
  catalog: &dyn CatalogRefresh,
  uid: &str,
  workout: &Workout,
  session_id: &str,
) -> Result<()> {
  if session_id.is_empty() {
    return Ok(());
  }

  let aggregates = aggregate_workout(workout);
  if aggregates.is_empty() {
    return Ok(());
  }

  let summary = load_session_summary(store, uid, session_id)
    .await?
    .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

  let mut by_exercise: BTreeMap<String, Vec<InstanceRecord>> = BTreeMap::new();
  for agg in &aggregates {
    by_exercise
      .entry(agg.exercise.exercise_id.clone())
      .or_default()
      .push(instance_record(session_id, summary.start_at, agg));
  }

  let mut last_batch = WriteBatch::new();
  let mut all_time_batch = WriteBatch::new();

  for (exercise_id, records) in &by_exercise {
    if let Some(latest) = latest_record(records, None) {
      last_batch.set(
        paths::last_session_metrics(uid, exercise_id),
        serde_json::to_value(LastSessionMetrics::from(latest))?,
      );
    }

    let mut metrics = load_all_time_metrics(store, uid, exercise_id).await?.unwrap_or_default();
    for record in records {
      metrics.absorb(record);
    }

    all_time_batch
      .set(paths::all_time_metrics(uid, exercise_id), serde_json::to_value(&metrics)?)
      .set_merge(
        paths::exercise(uid, exercise_id),
        json!({ "lastPerformedAt": summary.end_at }),
      );
  }

  store.commit(last_batch).await?;
  store.commit(all_time_batch).await?;

  let exercise_ids: Vec<String> = by_exercise.into_keys().collect();
  tracing::info!(
    uid = %uid,
    session_id = %session_id,
    exercises = exercise_ids.len(),
    "Exercise metrics merged"
  );
  catalog.exercises_changed(uid, &exercise_ids);

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Full Rescan Mode
/// ---------------------------------------------------------------------------

/// Rebuild an exercise's metrics from its complete history.
///
/// `records` must be sorted oldest first. Returns `None` when there is no
/// history left. On equal dates the edited session counts as the most recent.
///
/// `last_performed_at` falls back to the record date here; [`rescan_exercise`]
/// replaces it with the stored session's end time.
pub fn rebuild_metrics(records: &[InstanceRecord], edit: Option<&InFlightEdit>) -> Option<RebuiltMetrics> {
  let latest = latest_record(records, edit)?;

  let last_performed_at = match edit {
    Some(e) if e.session_id == latest.session_id => e.end_at,
    _ => latest.date,
  };

  Some(RebuiltMetrics {
    last_session: LastSessionMetrics::from(latest),
    all_time: AllTimeMetrics::from_records(records),
    last_performed_at,
  })
}

/// Replay every stored instance record of one exercise and overwrite its
/// metrics. With no records left both metrics documents are removed.
pub async fn rescan_exercise(
  store: &dyn DocumentStore,
  uid: &str,
  exercise_id: &str,
  edit: Option<&InFlightEdit>,
) -> Result<Option<RebuiltMetrics>> {
  let records = load_instance_records(store, uid, exercise_id).await?;
  let mut rebuilt = rebuild_metrics(&records, edit);

  if let Some(metrics) = rebuilt.as_mut() {
    if let Some(summary) = load_session_summary(store, uid, &metrics.last_session.last_session_id).await? {
      metrics.last_performed_at = summary.end_at;
    }
  }

  let mut batch = WriteBatch::new();
  match &rebuilt {
    Some(metrics) => {
      batch
        .set(
          paths::last_session_metrics(uid, exercise_id),
          serde_json::to_value(&metrics.last_session)?,
        )
        .set(paths::all_time_metrics(uid, exercise_id), serde_json::to_value(&metrics.all_time)?)
        .set_merge(
          paths::exercise(uid, exercise_id),
          json!({ "lastPerformedAt": metrics.last_performed_at }),
        );
    }
    None => {
      batch
        .delete(paths::last_session_metrics(uid, exercise_id))
        .delete(paths::all_time_metrics(uid, exercise_id))
        .set_merge(paths::exercise(uid, exercise_id), json!({ "lastPerformedAt": null }));
    }
  }
  store.commit(batch).await?;

  tracing::debug!(
    uid = %uid,
    exercise_id = %exercise_id,
    records = records.len(),
    cleared = rebuilt.is_none(),
    "Exercise metrics rescanned"
  );

  Ok(rebuilt)
}

/// Rescan a set of exercises, e.g. after an edit or to repair drift left by a
/// partially committed metrics write
pub async fn rescan_exercises(
  store: &dyn DocumentStore,
  uid: &str,
  exercise_ids: &[String],
  edit: Option<&InFlightEdit>,
) -> Result<()> {
  for exercise_id in exercise_ids {
    rescan_exercise(store, uid, exercise_id, edit).await?;
  }
  Ok(())
}
