use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMethod {
  Weight,
  Reps,
  Time,
}

/// Raw values entered for a set. Fields unrelated to the exercise's tracking
/// methods stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingData {
  #[serde(default, deserialize_with = "lenient_number")]
  pub weight: Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub reps: Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub time: Option<f64>,
}

/// Numbers arrive from form fields; numeric strings are accepted and anything
/// else (including NaN/inf) reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  let number = match value {
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  Ok(number.filter(|v| v.is_finite()))
}

/// Unknown method names are dropped instead of failing the whole workout
fn lenient_methods<'de, D>(deserializer: D) -> Result<Vec<TrackingMethod>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
  Ok(
    raw
      .into_iter()
      .filter_map(|v| serde_json::from_value::<TrackingMethod>(v).ok())
      .collect(),
  )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
  pub id: String,
  #[serde(default)]
  pub order: u32,
  #[serde(default)]
  pub completed: bool,
  #[serde(default)]
  pub tracking_data: TrackingData,
}

/// One exercise as it appears inside an in-progress workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseInstance {
  pub instance_id: String,
  pub exercise_id: String,
  pub name: String,
  #[serde(default)]
  pub category: String,
  #[serde(default, deserialize_with = "lenient_methods")]
  pub tracking_methods: Vec<TrackingMethod>,
  #[serde(default)]
  pub set_ids: Vec<String>,
  #[serde(default)]
  pub order: Option<u32>,
}

/// Client-held workout consumed by the engine; never persisted as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  #[serde(default)]
  pub exercises: Vec<ExerciseInstance>,
  #[serde(default)]
  pub sets_by_id: HashMap<String, WorkoutSet>,
}

impl Workout {
  /// Sets of an exercise in `set_ids` order, skipping ids missing from the map
  pub fn sets_for<'a>(&'a self, exercise: &'a ExerciseInstance) -> impl Iterator<Item = &'a WorkoutSet> + 'a {
    exercise
      .set_ids
      .iter()
      .filter_map(move |id| self.sets_by_id.get(id))
  }

  pub fn completed_sets_for<'a>(
    &'a self,
    exercise: &'a ExerciseInstance,
  ) -> impl Iterator<Item = &'a WorkoutSet> + 'a {
    self.sets_for(exercise).filter(|set| set.completed)
  }

  pub fn has_completed_sets(&self) -> bool {
    self
      .exercises
      .iter()
      .any(|exercise| self.completed_sets_for(exercise).next().is_some())
  }
}
