//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `listen` is empty
    /// - `freshness_secs` or `sweep_interval_secs` is 0
    /// - either viewport dimension is 0 or exceeds 10000
    /// - `capture_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_concurrent_captures` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.is_empty() {
            return Err(ConfigError::Invalid { field: "listen".into(), reason: "must not be empty".into() });
        }

        if self.freshness_secs == 0 {
            return Err(ConfigError::Invalid { field: "freshness_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        for (field, value) in [("viewport_width", self.viewport_width), ("viewport_height", self.viewport_height)] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
            if value > 10_000 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 10000".into() });
            }
        }

        if self.capture_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "capture_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.capture_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "capture_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_concurrent_captures == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_captures".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}
