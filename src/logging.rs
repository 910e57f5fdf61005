//! Logging setup for host applications embedding the engine

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level` when it is set. Calling this twice
/// is harmless; the second call leaves the first subscriber in place.
pub fn init(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

  let installed = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_target(true))
    .try_init()
    .is_ok();

  if installed {
    tracing::info!(level = %level, "Logging initialized");
  }
}

/// Initialize logging for tests (captured by the test harness)
pub fn init_test() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}
