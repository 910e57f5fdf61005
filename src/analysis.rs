//! Deterministic analysis layer for logged workouts
//!
//! Pure helpers only: 1RM estimation, calendar keys, tracking-method
//! classification and the per-exercise session aggregate computation. Nothing
//! in here touches the document store.

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ExerciseInstance, SessionAggregates, StoredSet, TrackingMethod, Workout, WorkoutSet};

/// ---------------------------------------------------------------------------
/// Metric Primitives
/// ---------------------------------------------------------------------------

/// Rep counts above this are too far from a true single to estimate from
const MAX_ESTIMATE_REPS: f64 = 5.0;

/// Estimated one-rep max, rounded to a whole number.
///
/// Only defined for 1 to 5 reps; a single is its own max.
pub fn estimate_1rm(weight: Option<f64>, reps: Option<f64>) -> Option<f64> {
  let weight = weight.filter(|w| w.is_finite())?;
  let reps = reps.filter(|r| r.is_finite())?;

  if reps <= 0.0 || reps > MAX_ESTIMATE_REPS {
    return None;
  }
  if reps == 1.0 {
    return Some(weight.round());
  }

  Some((weight * (1.0 + reps / 30.0)).round())
}

/// `YYYY-MM-DD` from the calendar fields of `date` in its own time zone
pub fn day_key<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
  format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Day key in the device's local calendar
pub fn local_day_key(date: &DateTime<Utc>) -> String {
  day_key(&date.with_timezone(&Local))
}

/// Whole minutes between start and end, never less than one
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
  let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
  (minutes.round() as i64).max(1)
}

/// ---------------------------------------------------------------------------
/// Tracking Combinations
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingCombo {
  WeightReps,
  WeightTime,
  Reps,
  Time,
}

impl TrackingCombo {
  /// Exact match against the four supported method sets. Anything else
  /// (`{reps, time}`, all three, empty) has no aggregate shape.
  pub fn classify(methods: &[TrackingMethod]) -> Option<Self> {
    let weight = methods.contains(&TrackingMethod::Weight);
    let reps = methods.contains(&TrackingMethod::Reps);
    let time = methods.contains(&TrackingMethod::Time);

    match (weight, reps, time) {
      (true, true, false) => Some(TrackingCombo::WeightReps),
      (true, false, true) => Some(TrackingCombo::WeightTime),
      (false, true, false) => Some(TrackingCombo::Reps),
      (false, false, true) => Some(TrackingCombo::Time),
      _ => None,
    }
  }

  /// Guess the combination from the values actually entered, for exercises
  /// that arrive without tracking metadata
  pub fn infer_from_sets<'a>(sets: impl IntoIterator<Item = &'a WorkoutSet>) -> Option<Self> {
    let (mut weight, mut reps, mut time) = (false, false, false);
    for set in sets {
      weight |= set.tracking_data.weight.is_some();
      reps |= is_positive(set.tracking_data.reps);
      time |= is_positive(set.tracking_data.time);
    }

    match (weight, reps, time) {
      (true, true, _) => Some(TrackingCombo::WeightReps),
      (true, false, true) => Some(TrackingCombo::WeightTime),
      (false, true, false) => Some(TrackingCombo::Reps),
      (false, false, true) => Some(TrackingCombo::Time),
      _ => None,
    }
  }

  pub fn methods(&self) -> &'static [TrackingMethod] {
    match self {
      TrackingCombo::WeightReps => &[TrackingMethod::Weight, TrackingMethod::Reps],
      TrackingCombo::WeightTime => &[TrackingMethod::Weight, TrackingMethod::Time],
      TrackingCombo::Reps => &[TrackingMethod::Reps],
      TrackingCombo::Time => &[TrackingMethod::Time],
    }
  }
}

fn is_positive(value: Option<f64>) -> bool {
  value.is_some_and(|v| v.is_finite() && v > 0.0)
}

fn positive(value: Option<f64>) -> Option<f64> {
  value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Missing or junk weight reads as bodyweight (0)
fn weight_or_zero(value: Option<f64>) -> f64 {
  value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// ---------------------------------------------------------------------------
/// Session Aggregates
/// ---------------------------------------------------------------------------

/// Everything the engine derives from one exercise of a finished workout
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseAggregate<'a> {
  pub exercise: &'a ExerciseInstance,
  pub order: u32,
  /// Completed sets only, renumbered from 1
  pub sets: Vec<StoredSet>,
  pub completed_set_count: u32,
  pub combo: Option<TrackingCombo>,
  pub aggregates: Option<SessionAggregates>,
}

impl ExerciseAggregate<'_> {
  pub fn best_est_1rm(&self) -> Option<f64> {
    match self.aggregates {
      Some(SessionAggregates::WeightReps { best_est_1rm, .. }) => best_est_1rm,
      _ => None,
    }
  }
}

/// Compute the combination-specific aggregates over completed sets.
///
/// Returns `None` when no set carries a usable value for the combination.
pub fn compute_aggregates(combo: TrackingCombo, completed: &[&WorkoutSet]) -> Option<SessionAggregates> {
  match combo {
    TrackingCombo::WeightReps => {
      let valid: Vec<(Option<f64>, f64)> = completed
        .iter()
        .filter_map(|s| positive(s.tracking_data.reps).map(|reps| (s.tracking_data.weight, reps)))
        .collect();
      if valid.is_empty() {
        return None;
      }

      let top_weight = valid
        .iter()
        .map(|(w, _)| weight_or_zero(*w))
        .fold(f64::MIN, f64::max);
      let top_reps_at_top_weight = valid
        .iter()
        .filter(|(w, _)| weight_or_zero(*w) == top_weight)
        .map(|(_, r)| *r)
        .fold(0.0, f64::max);
      let volume: f64 = valid.iter().map(|(w, r)| weight_or_zero(*w) * r).sum();
      let completed_rep_count: f64 = valid.iter().map(|(_, r)| r).sum();
      let best_est_1rm = valid
        .iter()
        .filter_map(|(w, r)| estimate_1rm(*w, Some(*r)))
        .reduce(f64::max);

      Some(SessionAggregates::WeightReps {
        top_weight,
        top_reps_at_top_weight,
        volume,
        completed_rep_count,
        best_est_1rm,
      })
    }
    TrackingCombo::WeightTime => {
      let valid: Vec<(f64, f64)> = completed
        .iter()
        .filter_map(|s| positive(s.tracking_data.time).map(|t| (weight_or_zero(s.tracking_data.weight), t)))
        .collect();
      if valid.is_empty() {
        return None;
      }

      let top_weight = valid.iter().map(|(w, _)| *w).fold(f64::MIN, f64::max);
      let top_time_at_top_weight = valid
        .iter()
        .filter(|(w, _)| *w == top_weight)
        .map(|(_, t)| *t)
        .fold(0.0, f64::max);

      Some(SessionAggregates::WeightTime {
        top_weight,
        top_time_at_top_weight,
      })
    }
    TrackingCombo::Reps => {
      let reps: Vec<f64> = completed.iter().filter_map(|s| positive(s.tracking_data.reps)).collect();
      if reps.is_empty() {
        return None;
      }
      Some(SessionAggregates::Reps {
        top_reps: reps.iter().copied().fold(0.0, f64::max),
        total_reps: reps.iter().sum(),
      })
    }
    TrackingCombo::Time => {
      let times: Vec<f64> = completed.iter().filter_map(|s| positive(s.tracking_data.time)).collect();
      if times.is_empty() {
        return None;
      }
      Some(SessionAggregates::Time {
        top_time: times.iter().copied().fold(0.0, f64::max),
        total_time: times.iter().sum(),
      })
    }
  }
}

/// Aggregate a single exercise. `position` is its index in the workout and is
/// used as the display order when the instance has none of its own.
pub fn aggregate_exercise<'a>(
  workout: &'a Workout,
  exercise: &'a ExerciseInstance,
  position: usize,
) -> ExerciseAggregate<'a> {
  let completed: Vec<&WorkoutSet> = workout.completed_sets_for(exercise).collect();

  let combo = if exercise.tracking_methods.is_empty() {
    TrackingCombo::infer_from_sets(completed.iter().copied())
  } else {
    TrackingCombo::classify(&exercise.tracking_methods)
  };

  if combo.is_none() && !completed.is_empty() {
    tracing::warn!(
      exercise_id = %exercise.exercise_id,
      methods = ?exercise.tracking_methods,
      "Unsupported tracking combination, recording sets without aggregates"
    );
  }

  // Which columns of a stored set are meaningful
  let methods: &[TrackingMethod] = match combo {
    Some(c) if exercise.tracking_methods.is_empty() => c.methods(),
    _ => &exercise.tracking_methods,
  };
  let keep = |method: TrackingMethod, value: Option<f64>| {
    if methods.contains(&method) {
      value
    } else {
      None
    }
  };

  let sets = completed
    .iter()
    .enumerate()
    .map(|(idx, set)| StoredSet {
      id: set.id.clone(),
      order: idx as u32 + 1,
      weight: keep(TrackingMethod::Weight, set.tracking_data.weight),
      reps: keep(TrackingMethod::Reps, set.tracking_data.reps),
      time: keep(TrackingMethod::Time, set.tracking_data.time),
    })
    .collect();

  let aggregates = combo.and_then(|c| compute_aggregates(c, &completed));

  ExerciseAggregate {
    exercise,
    order: exercise.order.unwrap_or(position as u32),
    sets,
    completed_set_count: completed.len() as u32,
    combo,
    aggregates,
  }
}

/// Aggregate every exercise that has at least one completed set, in workout order
pub fn aggregate_workout(workout: &Workout) -> Vec<ExerciseAggregate<'_>> {
  workout
    .exercises
    .iter()
    .enumerate()
    .map(|(position, exercise)| aggregate_exercise(workout, exercise, position))
    .filter(|agg| agg.completed_set_count > 0)
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_exercise, mock_set, mock_workout};
  use chrono::FixedOffset;

  #[test]
  fn test_estimate_1rm_table() {
    assert_eq!(estimate_1rm(Some(200.0), Some(1.0)), Some(200.0));
    assert_eq!(estimate_1rm(Some(120.0), Some(3.0)), Some(132.0));
    assert_eq!(estimate_1rm(Some(100.0), Some(5.0)), Some(117.0));
    assert_eq!(estimate_1rm(Some(300.0), Some(3.0)), Some(330.0));
    assert_eq!(estimate_1rm(Some(250.0), Some(4.0)), Some(283.0));
    assert_eq!(estimate_1rm(Some(205.0), Some(4.0)), Some(232.0));
    assert_eq!(estimate_1rm(Some(200.0), Some(8.0)), None);
    assert_eq!(estimate_1rm(None, Some(3.0)), None);
    assert_eq!(estimate_1rm(Some(150.0), Some(0.0)), None);
    assert_eq!(estimate_1rm(Some(150.0), Some(6.0)), None);
    assert_eq!(estimate_1rm(Some(f64::NAN), Some(3.0)), None);
  }

  #[test]
  fn test_day_key_uses_own_calendar_fields() {
    let utc = Utc.with_ymd_and_hms(2026, 1, 5, 23, 30, 0).unwrap();
    assert_eq!(day_key(&utc), "2026-01-05");

    // Same instant one hour east is already the next day
    let east = utc.with_timezone(&FixedOffset::east_opt(3600).unwrap());
    assert_eq!(day_key(&east), "2026-01-06");
  }

  #[test]
  fn test_duration_minutes_rounds_and_floors_at_one() {
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
    assert_eq!(duration_minutes(start, start), 1);
    assert_eq!(duration_minutes(start, start + chrono::Duration::seconds(89)), 1);
    assert_eq!(duration_minutes(start, start + chrono::Duration::seconds(90)), 2);
    assert_eq!(duration_minutes(start, start + chrono::Duration::minutes(47)), 47);
  }

  #[test]
  fn test_classify_supported_and_unsupported() {
    use crate::models::TrackingMethod::*;
    assert_eq!(TrackingCombo::classify(&[Weight, Reps]), Some(TrackingCombo::WeightReps));
    assert_eq!(TrackingCombo::classify(&[Time, Weight]), Some(TrackingCombo::WeightTime));
    assert_eq!(TrackingCombo::classify(&[Reps]), Some(TrackingCombo::Reps));
    assert_eq!(TrackingCombo::classify(&[Time]), Some(TrackingCombo::Time));
    assert_eq!(TrackingCombo::classify(&[Reps, Time]), None);
    assert_eq!(TrackingCombo::classify(&[Weight, Reps, Time]), None);
    assert_eq!(TrackingCombo::classify(&[]), None);
  }

  #[test]
  fn test_weight_reps_aggregate() {
    let workout = mock_workout(vec![(
      mock_exercise("i1", "bench", &[TrackingMethod::Weight, TrackingMethod::Reps], &["a", "b"]),
      vec![mock_set("a", 1, true, Some(150.0), Some(3.0), None), mock_set("b", 2, true, Some(140.0), Some(4.0), None)],
    )]);

    let aggs = aggregate_workout(&workout);
    assert_eq!(aggs.len(), 1);
    assert_eq!(
      aggs[0].aggregates,
      Some(SessionAggregates::WeightReps {
        top_weight: 150.0,
        top_reps_at_top_weight: 3.0,
        volume: 150.0 * 3.0 + 140.0 * 4.0,
        completed_rep_count: 7.0,
        best_est_1rm: estimate_1rm(Some(150.0), Some(3.0)),
      })
    );
    assert_eq!(aggs[0].best_est_1rm(), Some(165.0));
  }

  #[test]
  fn test_incomplete_sets_are_skipped_and_renumbered() {
    let workout = mock_workout(vec![(
      mock_exercise("i1", "bench", &[TrackingMethod::Weight, TrackingMethod::Reps], &["a", "b", "c"]),
      vec![
        mock_set("a", 1, false, Some(200.0), Some(1.0), None),
        mock_set("b", 2, true, Some(100.0), Some(10.0), Some(30.0)),
        mock_set("c", 3, true, Some(110.0), Some(8.0), None),
      ],
    )]);

    let agg = &aggregate_workout(&workout)[0];
    assert_eq!(agg.completed_set_count, 2);
    assert_eq!(agg.sets.iter().map(|s| s.order).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(agg.sets[0].id, "b");
    // time is not a tracked method here
    assert_eq!(agg.sets[0].time, None);
    match agg.aggregates {
      Some(SessionAggregates::WeightReps { top_weight, best_est_1rm, .. }) => {
        assert_eq!(top_weight, 110.0);
        assert_eq!(best_est_1rm, None);
      }
      other => panic!("Wrong aggregates: {:?}", other),
    }
  }

  #[test]
  fn test_zero_weight_counts_only_with_reps() {
    let workout = mock_workout(vec![(
      mock_exercise("i1", "pullup", &[TrackingMethod::Weight, TrackingMethod::Reps], &["a", "b"]),
      vec![mock_set("a", 1, true, Some(0.0), Some(12.0), None), mock_set("b", 2, true, Some(25.0), None, None)],
    )]);

    let agg = &aggregate_workout(&workout)[0];
    assert_eq!(agg.completed_set_count, 2);
    match agg.aggregates {
      Some(SessionAggregates::WeightReps { top_weight, top_reps_at_top_weight, volume, .. }) => {
        assert_eq!(top_weight, 0.0);
        assert_eq!(top_reps_at_top_weight, 12.0);
        assert_eq!(volume, 0.0);
      }
      other => panic!("Wrong aggregates: {:?}", other),
    }
  }

  #[test]
  fn test_weight_time_reps_time_aggregates() {
    let workout = mock_workout(vec![
      (
        mock_exercise("i1", "carry", &[TrackingMethod::Weight, TrackingMethod::Time], &["a", "b", "c"]),
        vec![
          mock_set("a", 1, true, Some(50.0), None, Some(40.0)),
          mock_set("b", 2, true, Some(50.0), None, Some(55.0)),
          mock_set("c", 3, true, Some(70.0), None, None),
        ],
      ),
      (
        mock_exercise("i2", "pushup", &[TrackingMethod::Reps], &["d", "e"]),
        vec![mock_set("d", 1, true, None, Some(20.0), None), mock_set("e", 2, true, None, Some(15.0), None)],
      ),
      (
        mock_exercise("i3", "plank", &[TrackingMethod::Time], &["f"]),
        vec![mock_set("f", 1, true, None, None, Some(90.0))],
      ),
    ]);

    let aggs = aggregate_workout(&workout);
    assert_eq!(
      aggs[0].aggregates,
      Some(SessionAggregates::WeightTime { top_weight: 50.0, top_time_at_top_weight: 55.0 })
    );
    assert_eq!(aggs[1].aggregates, Some(SessionAggregates::Reps { top_reps: 20.0, total_reps: 35.0 }));
    assert_eq!(aggs[2].aggregates, Some(SessionAggregates::Time { top_time: 90.0, total_time: 90.0 }));
    assert_eq!(aggs.iter().map(|a| a.order).collect::<Vec<_>>(), vec![0, 1, 2]);
  }

  #[test]
  fn test_unsupported_combo_records_sets_without_aggregates() {
    let workout = mock_workout(vec![(
      mock_exercise("i1", "mountain-climber", &[TrackingMethod::Reps, TrackingMethod::Time], &["a"]),
      vec![mock_set("a", 1, true, None, Some(30.0), Some(45.0))],
    )]);

    let agg = &aggregate_workout(&workout)[0];
    assert_eq!(agg.combo, None);
    assert_eq!(agg.aggregates, None);
    assert_eq!(agg.completed_set_count, 1);
    assert_eq!(agg.sets[0].reps, Some(30.0));
    assert_eq!(agg.sets[0].time, Some(45.0));
  }

  #[test]
  fn test_missing_tracking_methods_are_inferred() {
    let workout = mock_workout(vec![(
      mock_exercise("i1", "squat", &[], &["a"]),
      vec![mock_set("a", 1, true, Some(225.0), Some(5.0), None)],
    )]);

    let agg = &aggregate_workout(&workout)[0];
    assert_eq!(agg.combo, Some(TrackingCombo::WeightReps));
    assert_eq!(agg.sets[0].weight, Some(225.0));
    assert!(agg.aggregates.is_some());
  }

  #[test]
  fn test_exercises_without_completed_sets_are_dropped() {
    let workout = mock_workout(vec![
      (
        mock_exercise("i1", "bench", &[TrackingMethod::Weight, TrackingMethod::Reps], &["a"]),
        vec![mock_set("a", 1, false, Some(100.0), Some(5.0), None)],
      ),
      (mock_exercise("i2", "row", &[TrackingMethod::Weight, TrackingMethod::Reps], &[]), vec![]),
    ]);

    assert!(aggregate_workout(&workout).is_empty());
    assert!(!workout.has_completed_sets());
  }
}
