use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// ---------------------------------------------------------------------------
/// Session Aggregates: one shape per tracking combination
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SessionAggregates {
  #[serde(rename_all = "camelCase")]
  WeightReps {
    top_weight: f64,
    top_reps_at_top_weight: f64,
    volume: f64,
    completed_rep_count: f64,
    #[serde(rename = "bestEst1RM", default, skip_serializing_if = "Option::is_none")]
    best_est_1rm: Option<f64>,
  },
  #[serde(rename_all = "camelCase")]
  WeightTime {
    top_weight: f64,
    top_time_at_top_weight: f64,
  },
  #[serde(rename_all = "camelCase")]
  Reps { top_reps: f64, total_reps: f64 },
  #[serde(rename_all = "camelCase")]
  Time { top_time: f64, total_time: f64 },
}

fn field(doc: &Value, name: &str) -> Option<f64> {
  doc.get(name).and_then(Value::as_f64).filter(|v| v.is_finite())
}

impl SessionAggregates {
  /// Best-effort classification of an untagged record from the fields it
  /// carries. Used for flat legacy documents that predate the `kind` tag.
  pub fn infer(doc: &Value) -> Option<Self> {
    let top_weight = field(doc, "topWeight");
    let reps_at_top = field(doc, "topRepsAtTopWeight");
    let time_at_top = field(doc, "topTimeAtTopWeight");
    let volume = field(doc, "volume");
    let rep_count = field(doc, "completedRepCount");

    if let (Some(top_weight), Some(time_at_top)) = (top_weight, time_at_top) {
      if reps_at_top.is_none() && volume.is_none() {
        return Some(SessionAggregates::WeightTime {
          top_weight,
          top_time_at_top_weight: time_at_top,
        });
      }
    }

    if top_weight.is_some() || volume.is_some() || rep_count.is_some() {
      return Some(SessionAggregates::WeightReps {
        top_weight: top_weight.unwrap_or(0.0),
        top_reps_at_top_weight: reps_at_top.unwrap_or(0.0),
        volume: volume.unwrap_or(0.0),
        completed_rep_count: rep_count.unwrap_or(0.0),
        best_est_1rm: field(doc, "bestEst1RM"),
      });
    }

    let (top_reps, total_reps) = (field(doc, "topReps"), field(doc, "totalReps"));
    if top_reps.is_some() || total_reps.is_some() {
      return Some(SessionAggregates::Reps {
        top_reps: top_reps.unwrap_or(0.0),
        total_reps: total_reps.unwrap_or(0.0),
      });
    }

    let (top_time, total_time) = (field(doc, "topTime"), field(doc, "totalTime"));
    if top_time.is_some() || total_time.is_some() {
      return Some(SessionAggregates::Time {
        top_time: top_time.unwrap_or(0.0),
        total_time: total_time.unwrap_or(0.0),
      });
    }

    None
  }
}

/// ---------------------------------------------------------------------------
/// Instance Record: one exercise's contribution from one session
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
  pub session_id: String,
  pub exercise_in_session_id: String,
  #[serde(default)]
  pub exercise_id: String,
  /// Position of the exercise within its session
  #[serde(default)]
  pub order: u32,
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub completed_set_count: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aggregates: Option<SessionAggregates>,
}

impl InstanceRecord {
  /// Decode a stored record, inferring the aggregate shape when the document
  /// has no tagged `aggregates` block
  pub fn from_document(doc: &Value) -> Result<Self> {
    let mut record: InstanceRecord = serde_json::from_value(doc.clone())?;
    if record.aggregates.is_none() {
      record.aggregates = SessionAggregates::infer(doc);
    }
    Ok(record)
  }
}

/// ---------------------------------------------------------------------------
/// Per-exercise metrics documents
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSessionMetrics {
  pub last_session_id: String,
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub completed_set_count: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aggregates: Option<SessionAggregates>,
}

impl From<&InstanceRecord> for LastSessionMetrics {
  fn from(record: &InstanceRecord) -> Self {
    Self {
      last_session_id: record.session_id.clone(),
      date: record.date,
      completed_set_count: record.completed_set_count,
      aggregates: record.aggregates,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllTimeMetrics {
  #[serde(default)]
  pub total_sets: u64,
  #[serde(default)]
  pub total_reps: f64,
  #[serde(default)]
  pub total_volume_all_time: f64,
  #[serde(default)]
  pub total_time: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_top_weight: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_top_reps_at_top_weight: Option<f64>,
  #[serde(rename = "maxBestEst1RM", default, skip_serializing_if = "Option::is_none")]
  pub max_best_est_1rm: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_top_time_at_top_weight: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_top_reps: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_total_reps: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_top_time: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_total_time: Option<f64>,
}

fn max_opt(current: Option<f64>, candidate: Option<f64>) -> Option<f64> {
  match (current, candidate) {
    (Some(a), Some(b)) => Some(a.max(b)),
    (a, b) => a.or(b),
  }
}

/// Fold a (top weight, secondary) pair into the running maxima. The secondary
/// value belongs to the heaviest weight, so it only moves on a tie or a new max.
fn absorb_top(max_weight: &mut Option<f64>, max_secondary: &mut Option<f64>, weight: f64, secondary: f64) {
  match *max_weight {
    Some(current) if weight < current => {}
    Some(current) if weight == current => {
      *max_secondary = max_opt(*max_secondary, Some(secondary));
    }
    _ => {
      *max_weight = Some(weight);
      *max_secondary = Some(secondary);
    }
  }
}

impl AllTimeMetrics {
  /// Fold one session's contribution into the running totals and maxima.
  ///
  /// This is the single fold shared by the incremental writer and the full
  /// rescan, so both paths produce the same documents for the same records.
  pub fn absorb(&mut self, record: &InstanceRecord) {
    self.total_sets += u64::from(record.completed_set_count);

    match record.aggregates {
      Some(SessionAggregates::WeightReps {
        top_weight,
        top_reps_at_top_weight,
        volume,
        completed_rep_count,
        best_est_1rm,
      }) => {
        self.total_reps += completed_rep_count;
        self.total_volume_all_time += volume;
        absorb_top(
          &mut self.max_top_weight,
          &mut self.max_top_reps_at_top_weight,
          top_weight,
          top_reps_at_top_weight,
        );
        self.max_best_est_1rm = max_opt(self.max_best_est_1rm, best_est_1rm);
      }
      Some(SessionAggregates::WeightTime {
        top_weight,
        top_time_at_top_weight,
      }) => {
        absorb_top(
          &mut self.max_top_weight,
          &mut self.max_top_time_at_top_weight,
          top_weight,
          top_time_at_top_weight,
        );
      }
      Some(SessionAggregates::Reps { top_reps, total_reps }) => {
        self.total_reps += total_reps;
        self.max_top_reps = max_opt(self.max_top_reps, Some(top_reps));
        self.max_total_reps = max_opt(self.max_total_reps, Some(total_reps));
      }
      Some(SessionAggregates::Time { top_time, total_time }) => {
        self.total_time += total_time;
        self.max_top_time = max_opt(self.max_top_time, Some(top_time));
        self.max_total_time = max_opt(self.max_total_time, Some(total_time));
      }
      None => {}
    }
  }

  pub fn from_records<'a>(records: impl IntoIterator<Item = &'a InstanceRecord>) -> Self {
    let mut metrics = Self::default();
    for record in records {
      metrics.absorb(record);
    }
    metrics
  }
}
