//! Exercise-catalog collaborator
//!
//! The catalog (names, categories, `lastPerformedAt`) is owned by the host app.
//! The engine only tells it when cached per-exercise metadata may be stale.

/// Refresh hook handed to the engine at construction time
pub trait CatalogRefresh: Send + Sync {
  /// Called after writes that may have changed `lastPerformedAt` for these exercises
  fn exercises_changed(&self, uid: &str, exercise_ids: &[String]);
}

/// Catalog hook that ignores notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCatalog;

impl CatalogRefresh for NoopCatalog {
  fn exercises_changed(&self, _uid: &str, _exercise_ids: &[String]) {}
}

impl<F> CatalogRefresh for F
where
  F: Fn(&str, &[String]) + Send + Sync,
{
  fn exercises_changed(&self, uid: &str, exercise_ids: &[String]) {
    self(uid, exercise_ids)
  }
}
