//! Core types and shared functionality for sitesnap.
//!
//! This crate provides:
//! - Disk-backed screenshot cache with mtime-based freshness
//! - Cache key derivation policies
//! - Unified error types
//! - Configuration structures
//! - Process-wide capture metrics

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;

pub use cache::{CacheStore, CachedEntry, KeyPolicy, cache_key};
pub use config::AppConfig;
pub use error::Error;
pub use metrics::Metrics;
