//! Engine configuration.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `event_buffer_capacity` is at least 1.

use crate::events::DEFAULT_EVENT_BUFFER_CAPACITY;
use crate::logging::{normalize_level, LoggingError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings consumed by `DataService::open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite file; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_buffer_capacity: usize,
    /// Falls back to `default_log_level()` when unset.
    pub log_level: Option<String>,
    /// Logging starts only when a directory is configured.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            event_buffer_capacity: DEFAULT_EVENT_BUFFER_CAPACITY,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("event_buffer_capacity must be at least 1")]
    ZeroBufferCapacity,
    #[error("{0}")]
    Logging(#[from] LoggingError),
}

impl EngineConfig {
    /// In-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store with default settings.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if let Some(level) = &self.log_level {
            normalize_level(level)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.event_buffer_capacity, 100);
    }

    #[test]
    fn fields_are_read() {
        let config = EngineConfig::from_json_str(
            r#"{"db_path": "/tmp/t.db", "event_buffer_capacity": 8, "log_level": "warn"}"#,
        )
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/t.db")));
        assert_eq!(config.event_buffer_capacity, 8);
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"event_buffer_capacity": 0}"#),
            Err(ConfigError::ZeroBufferCapacity)
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"log_level": "loud"}"#),
            Err(ConfigError::Logging(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"unknown": 1}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
