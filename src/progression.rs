//! Personal-Record Progression Engine
//!
//! Compares a session's freshly computed aggregates against an exercise's
//! stored metrics and reports what improved.
//!
//! Key rules:
//! - At most one "standard" item per exercise, picked from a fixed priority
//!   table per tracking combination (first match wins)
//! - All-time comparisons run first; last-session ones only if none matched
//! - A secondary stat (reps/time at top weight) only counts while the top
//!   weight is tied with the baseline it is compared against
//! - A new estimated 1RM is reported independently of the standard item
//! - No stored baseline means nothing to beat, so no item
//!
//! Call this before the session's metrics are folded in, otherwise the
//! session is compared against itself.

use serde::{Deserialize, Serialize};

use crate::analysis::aggregate_workout;
use crate::error::Result;
use crate::metrics::{load_all_time_metrics, load_last_session_metrics};
use crate::models::{AllTimeMetrics, LastSessionMetrics, SessionAggregates, Workout};
use crate::store::DocumentStore;

pub const TITLE_NEW_RECORDS: &str = "New Personal Records!";
pub const TITLE_NO_RECORDS: &str = "Workout Complete";

// ---------------------------------------------------------------------------
/// Progression Item: one detected improvement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressionKind {
    /// Beat the best value ever recorded
    AllTime,
    /// Beat the previous session only
    LastSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressionCategory {
    Standard,
    #[serde(rename = "est1RM")]
    Est1Rm,
}

/// Which stat improved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Weight,
    Reps,
    Time,
    Volume,
    TotalReps,
    TotalTime,
    #[serde(rename = "est1RM")]
    Est1Rm,
}

impl ChangeType {
    /// Label shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            Self::Weight => "Weight",
            Self::Reps => "Reps",
            Self::Time => "Time",
            Self::Volume => "Volume",
            Self::TotalReps => "Total Reps",
            Self::TotalTime => "Total Time",
            Self::Est1Rm => "Est. 1RM",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionItem {
    pub exercise_id: String,
    pub exercise_name: String,
    pub change_type: ChangeType,
    pub change_spec: String,
    /// Human-readable increase, e.g. `+13.3%` or `170lbs`
    pub change: String,
    pub kind: ProgressionKind,
    pub category: ProgressionCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionReport {
    pub title: String,
    pub items: Vec<ProgressionItem>,
}

impl ProgressionReport {
    pub fn from_items(items: Vec<ProgressionItem>) -> Self {
        let title = if items.is_empty() {
            TITLE_NO_RECORDS
        } else {
            TITLE_NEW_RECORDS
        };
        Self {
            title: title.to_string(),
            items,
        }
    }
}

// ---------------------------------------------------------------------------
/// Formatting
// ---------------------------------------------------------------------------

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Render an improvement from `prev` to `next`.
///
/// Without a usable previous value the new value itself is shown.
pub fn format_increase(prev: Option<f64>, next: f64) -> String {
    match prev.filter(|p| p.is_finite() && *p > 0.0) {
        None => format!("{}lbs", format_number(next)),
        Some(prev) => {
            let pct = (next - prev) / prev * 100.0;
            if pct > 0.0 {
                format!("+{:.1}%", pct)
            } else {
                "+0%".to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
/// Priority Tables
// ---------------------------------------------------------------------------

/// A stat that beat its baseline
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gain {
    change_type: ChangeType,
    prev: f64,
    next: f64,
}

fn gain(change_type: ChangeType, baseline: Option<f64>, value: f64) -> Option<Gain> {
    let prev = baseline.filter(|b| b.is_finite())?;
    (value > prev).then_some(Gain {
        change_type,
        prev,
        next: value,
    })
}

/// Secondary stat at the top weight, gated on the weight being unchanged
fn tied_gain(
    change_type: ChangeType,
    baseline_weight: Option<f64>,
    weight: f64,
    baseline: Option<f64>,
    value: f64,
) -> Option<Gain> {
    if baseline_weight == Some(weight) {
        gain(change_type, baseline, value)
    } else {
        None
    }
}

fn all_time_gain(session: &SessionAggregates, all_time: &AllTimeMetrics) -> Option<Gain> {
    match *session {
        SessionAggregates::WeightReps {
            top_weight,
            top_reps_at_top_weight,
            ..
        } => gain(ChangeType::Weight, all_time.max_top_weight, top_weight).or_else(|| {
            tied_gain(
                ChangeType::Reps,
                all_time.max_top_weight,
                top_weight,
                all_time.max_top_reps_at_top_weight,
                top_reps_at_top_weight,
            )
        }),
        SessionAggregates::WeightTime {
            top_weight,
            top_time_at_top_weight,
        } => gain(ChangeType::Weight, all_time.max_top_weight, top_weight).or_else(|| {
            tied_gain(
                ChangeType::Time,
                all_time.max_top_weight,
                top_weight,
                all_time.max_top_time_at_top_weight,
                top_time_at_top_weight,
            )
        }),
        SessionAggregates::Reps {
            top_reps,
            total_reps,
        } => gain(ChangeType::Reps, all_time.max_top_reps, top_reps)
            .or_else(|| gain(ChangeType::TotalReps, all_time.max_total_reps, total_reps)),
        SessionAggregates::Time {
            top_time,
            total_time,
        } => gain(ChangeType::Time, all_time.max_top_time, top_time)
            .or_else(|| gain(ChangeType::TotalTime, all_time.max_total_time, total_time)),
    }
}

/// Only sessions tracked the same way are comparable
fn last_session_gain(session: &SessionAggregates, last: &SessionAggregates) -> Option<Gain> {
    match (*session, *last) {
        (
            SessionAggregates::WeightReps {
                top_weight,
                top_reps_at_top_weight,
                volume,
                ..
            },
            SessionAggregates::WeightReps {
                top_weight: last_weight,
                top_reps_at_top_weight: last_reps,
                volume: last_volume,
                ..
            },
        ) => gain(ChangeType::Weight, Some(last_weight), top_weight)
            .or_else(|| {
                tied_gain(
                    ChangeType::Reps,
                    Some(last_weight),
                    top_weight,
                    Some(last_reps),
                    top_reps_at_top_weight,
                )
            })
            .or_else(|| gain(ChangeType::Volume, Some(last_volume), volume)),
        (
            SessionAggregates::WeightTime {
                top_weight,
                top_time_at_top_weight,
            },
            SessionAggregates::WeightTime {
                top_weight: last_weight,
                top_time_at_top_weight: last_time,
            },
        ) => gain(ChangeType::Weight, Some(last_weight), top_weight).or_else(|| {
            tied_gain(
                ChangeType::Time,
                Some(last_weight),
                top_weight,
                Some(last_time),
                top_time_at_top_weight,
            )
        }),
        (
            SessionAggregates::Reps {
                top_reps,
                total_reps,
            },
            SessionAggregates::Reps {
                top_reps: last_top,
                total_reps: last_total,
            },
        ) => gain(ChangeType::Reps, Some(last_top), top_reps)
            .or_else(|| gain(ChangeType::TotalReps, Some(last_total), total_reps)),
        (
            SessionAggregates::Time {
                top_time,
                total_time,
            },
            SessionAggregates::Time {
                top_time: last_top,
                total_time: last_total,
            },
        ) => gain(ChangeType::Time, Some(last_top), top_time)
            .or_else(|| gain(ChangeType::TotalTime, Some(last_total), total_time)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
/// Detection
// ---------------------------------------------------------------------------

/// Detect the improvements of one exercise's session over its stored metrics.
///
/// Returns the standard item (if any) followed by the est-1RM item (if any).
pub fn detect_progressions(
    exercise_id: &str,
    exercise_name: &str,
    session: &SessionAggregates,
    last: Option<&LastSessionMetrics>,
    all_time: Option<&AllTimeMetrics>,
) -> Vec<ProgressionItem> {
    let item = |g: Gain, kind: ProgressionKind, category: ProgressionCategory| ProgressionItem {
        exercise_id: exercise_id.to_string(),
        exercise_name: exercise_name.to_string(),
        change_type: g.change_type,
        change_spec: g.change_type.label().to_string(),
        change: format_increase(Some(g.prev), g.next),
        kind,
        category,
    };

    let mut items = Vec::new();

    let standard = all_time
        .and_then(|at| all_time_gain(session, at))
        .map(|g| (g, ProgressionKind::AllTime))
        .or_else(|| {
            last.and_then(|ls| ls.aggregates.as_ref())
                .and_then(|prev| last_session_gain(session, prev))
                .map(|g| (g, ProgressionKind::LastSession))
        });
    if let Some((g, kind)) = standard {
        items.push(item(g, kind, ProgressionCategory::Standard));
    }

    let best_est_1rm = match session {
        SessionAggregates::WeightReps { best_est_1rm, .. } => *best_est_1rm,
        _ => None,
    };
    if let (Some(best), Some(at)) = (best_est_1rm, all_time) {
        if let Some(g) = gain(ChangeType::Est1Rm, at.max_best_est_1rm, best) {
            items.push(item(g, ProgressionKind::AllTime, ProgressionCategory::Est1Rm));
        }
    }

    items
}

/// Progression items for every exercise of a finished workout, compared
/// against the metrics currently stored for `uid`
pub async fn calculate_progressions_for_workout(
    store: &dyn DocumentStore,
    uid: &str,
    workout: &Workout,
) -> Result<ProgressionReport> {
    let mut items = Vec::new();

    for agg in aggregate_workout(workout) {
        let Some(session) = agg.aggregates else {
            continue;
        };
        let exercise = agg.exercise;

        let last = load_last_session_metrics(store, uid, &exercise.exercise_id).await?;
        let all_time = load_all_time_metrics(store, uid, &exercise.exercise_id).await?;

        let found = detect_progressions(
            &exercise.exercise_id,
            &exercise.name,
            &session,
            last.as_ref(),
            all_time.as_ref(),
        );
        tracing::debug!(
            exercise_id = %exercise.exercise_id,
            items = found.len(),
            "Progressions evaluated"
        );
        items.extend(found);
    }

    tracing::info!(uid = %uid, items = items.len(), "Progressions calculated");
    Ok(ProgressionReport::from_items(items))
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
