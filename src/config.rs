//! Engine configuration loaded from the environment (and `.env` when present)

use std::env;

use crate::error::{EngineError, Result};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DATABASE_URL_VAR: &str = "LIFT_LOG_DATABASE_URL";
const MAX_CONNECTIONS_VAR: &str = "LIFT_LOG_MAX_CONNECTIONS";
const LOG_LEVEL_VAR: &str = "LIFT_LOG_LOG_LEVEL";

const DEFAULT_DATABASE_URL: &str = "sqlite://lift-log.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  pub database_url: String,
  pub max_connections: u32,
  pub log_level: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      log_level: DEFAULT_LOG_LEVEL.to_string(),
    }
  }
}

impl EngineConfig {
  /// Load `.env` (if any) and then read the process environment
  pub fn load() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_env()
  }

  /// Read configuration from the process environment, falling back to defaults
  pub fn from_env() -> Result<Self> {
    let defaults = Self::default();

    let database_url = match env::var(DATABASE_URL_VAR) {
      Ok(url) if url.trim().is_empty() => {
        return Err(EngineError::MissingConfig(DATABASE_URL_VAR.into()))
      }
      Ok(url) => url,
      Err(_) => defaults.database_url,
    };

    let max_connections = match env::var(MAX_CONNECTIONS_VAR) {
      Ok(raw) => {
        let parsed: u32 = raw.trim().parse().map_err(|_| {
          EngineError::InvalidConfig(format!("{} must be a positive integer, got '{}'", MAX_CONNECTIONS_VAR, raw))
        })?;
        if parsed == 0 {
          return Err(EngineError::InvalidConfig(format!(
            "{} must be at least 1",
            MAX_CONNECTIONS_VAR
          )));
        }
        parsed
      }
      Err(_) => defaults.max_connections,
    };

    let log_level = env::var(LOG_LEVEL_VAR).unwrap_or(defaults.log_level);

    Ok(Self {
      database_url,
      max_connections,
      log_level,
    })
  }
}
