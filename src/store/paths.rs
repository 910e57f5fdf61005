//! Document path shapes used by the engine

pub const LAST_SESSION_METRICS: &str = "lastSessionMetrics";
pub const ALL_TIME_METRICS: &str = "allTimeMetrics";

pub fn session(uid: &str, session_id: &str) -> String {
  format!("users/{}/sessions/{}", uid, session_id)
}

pub fn session_exercises(uid: &str, session_id: &str) -> String {
  format!("{}/exercises", session(uid, session_id))
}

pub fn session_exercise(uid: &str, session_id: &str, instance_id: &str) -> String {
  format!("{}/{}", session_exercises(uid, session_id), instance_id)
}

pub fn exercise(uid: &str, exercise_id: &str) -> String {
  format!("users/{}/exercises/{}", uid, exercise_id)
}

pub fn instances(uid: &str, exercise_id: &str) -> String {
  format!("{}/instances", exercise(uid, exercise_id))
}

/// Instance ids are deterministic so an edit can address the record it replaces
pub fn instance_id(session_id: &str, instance_id: &str) -> String {
  format!("{}-{}", session_id, instance_id)
}

pub fn instance(uid: &str, exercise_id: &str, session_id: &str, instance_id: &str) -> String {
  format!(
    "{}/{}",
    instances(uid, exercise_id),
    self::instance_id(session_id, instance_id)
  )
}

pub fn last_session_metrics(uid: &str, exercise_id: &str) -> String {
  format!("{}/metrics/{}", exercise(uid, exercise_id), LAST_SESSION_METRICS)
}

pub fn all_time_metrics(uid: &str, exercise_id: &str) -> String {
  format!("{}/metrics/{}", exercise(uid, exercise_id), ALL_TIME_METRICS)
}

/// Split a document path into (collection, id)
pub fn split(path: &str) -> (&str, &str) {
  match path.rfind('/') {
    Some(idx) => (&path[..idx], &path[idx + 1..]),
    None => ("", path),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_path_shapes() {
    assert_eq!(session("u1", "s1"), "users/u1/sessions/s1");
    assert_eq!(session_exercise("u1", "s1", "i1"), "users/u1/sessions/s1/exercises/i1");
    assert_eq!(instance("u1", "bench", "s1", "i1"), "users/u1/exercises/bench/instances/s1-i1");
    assert_eq!(
      all_time_metrics("u1", "bench"),
      "users/u1/exercises/bench/metrics/allTimeMetrics"
    );
  }

  #[test]
  fn test_split() {
    assert_eq!(split("users/u1/sessions/s1"), ("users/u1/sessions", "s1"));
    assert_eq!(split("root"), ("", "root"));
  }
}
