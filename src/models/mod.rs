pub mod metrics;
pub mod session;
pub mod workout;

pub use metrics::{AllTimeMetrics, InstanceRecord, LastSessionMetrics, SessionAggregates};
pub use session::{EditedSession, ExerciseCount, SessionExerciseRecord, SessionSummary, SessionWrite, StoredSet};
pub use workout::{ExerciseInstance, TrackingData, TrackingMethod, Workout, WorkoutSet};
