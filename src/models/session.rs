use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted summary of one finished workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
  pub start_at: DateTime<Utc>,
  pub end_at: DateTime<Utc>,
  pub duration_min: i64,
  pub day_key: String,
  pub total_completed_sets: u32,
  #[serde(default)]
  pub exercise_counts: Vec<ExerciseCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCount {
  pub exercise_id: String,
  pub name: String,
  #[serde(default)]
  pub category: String,
  pub completed_set_count: u32,
  pub order: u32,
}

/// A completed set as stored under a session. Unused methods are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSet {
  pub id: String,
  pub order: u32,
  pub weight: Option<f64>,
  pub reps: Option<f64>,
  pub time: Option<f64>,
}

/// One exercise's completed sets inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExerciseRecord {
  pub exercise_id: String,
  #[serde(default)]
  pub instance_id: String,
  pub order: u32,
  #[serde(default)]
  pub sets: Vec<StoredSet>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub est1rm: Option<f64>,
}

/// Outcome of writing a new session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWrite {
  /// Empty when the workout had nothing to record
  pub session_id: String,
  pub date: DateTime<Utc>,
  pub instances: Vec<super::InstanceRecord>,
}

impl SessionWrite {
  pub fn is_empty(&self) -> bool {
    self.session_id.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedSession {
  pub date: DateTime<Utc>,
}
