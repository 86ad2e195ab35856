//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SITESNAP_*)
//! 2. TOML config file (if SITESNAP_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::KeyPolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SITESNAP_*)
/// 2. TOML config file (if SITESNAP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP endpoint binds to.
    ///
    /// Set via SITESNAP_LISTEN environment variable.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding cached screenshots.
    ///
    /// Set via SITESNAP_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// How long a cached screenshot stays servable, in seconds.
    ///
    /// Set via SITESNAP_FRESHNESS_SECS environment variable.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// How often the expiry sweeper runs, in seconds.
    ///
    /// Set via SITESNAP_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Browser viewport width in pixels.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    /// Browser viewport height in pixels.
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Bound on a single navigate-and-capture sequence, in milliseconds.
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,

    /// Post-navigation settle delay, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Cap on simultaneous browser launches.
    #[serde(default = "default_max_concurrent_captures")]
    pub max_concurrent_captures: usize,

    /// Which part of the URL identifies a cache artifact: `host` or
    /// `full-url`.
    #[serde(default)]
    pub key_policy: KeyPolicy,

    /// Launch the browser with sandboxing disabled.
    ///
    /// Needed only in constrained container environments.
    #[serde(default)]
    pub no_sandbox: bool,
}

fn default_listen() -> String {
    "127.0.0.1:8000".into()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_freshness_secs() -> u64 {
    60 * 60 * 24
}

fn default_sweep_interval_secs() -> u64 {
    60 * 60 * 3
}

fn default_viewport_width() -> u32 {
    1366
}

fn default_viewport_height() -> u32 {
    768
}

fn default_capture_timeout_ms() -> u64 {
    30_000
}

fn default_settle_ms() -> u64 {
    500
}

fn default_max_concurrent_captures() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            cache_dir: default_cache_dir(),
            freshness_secs: default_freshness_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            capture_timeout_ms: default_capture_timeout_ms(),
            settle_ms: default_settle_ms(),
            max_concurrent_captures: default_max_concurrent_captures(),
            key_policy: KeyPolicy::default(),
            no_sandbox: false,
        }
    }
}

impl AppConfig {
    /// Freshness window as a Duration.
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Sweep cadence as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Capture timeout as a Duration.
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Settle delay as a Duration.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Viewport as `(width, height)`.
    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SITESNAP_`
    /// 2. TOML file from `SITESNAP_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SITESNAP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SITESNAP_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
