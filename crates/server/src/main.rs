//! sitesnap server entry point.
//!
//! Boots the HTTP endpoint, the shared disk cache, and the background expiry
//! sweeper.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use sitesnap_client::{CaptureOptions, ChromiumCapturer};
use sitesnap_core::{AppConfig, CacheStore, Metrics};

mod error;
mod handler;
mod orchestrator;
mod sweeper;

use orchestrator::CaptureOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;

    let store = Arc::new(CacheStore::open(&config.cache_dir, config.freshness_window()).await?);
    let metrics = Arc::new(Metrics::new());
    let capturer = Arc::new(ChromiumCapturer::new(config.no_sandbox));

    let capture_opts = CaptureOptions {
        viewport: config.viewport(),
        timeout: config.capture_timeout(),
        settle: config.settle(),
    };

    let orchestrator = Arc::new(CaptureOrchestrator::new(
        store.clone(),
        capturer,
        capture_opts,
        config.key_policy,
        config.max_concurrent_captures,
        metrics.clone(),
    ));

    tokio::spawn(sweeper::run(store, config.sweep_interval(), metrics));

    let app = handler::router(orchestrator);
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(listen = %config.listen, cache_dir = %config.cache_dir.display(), "sitesnap listening");

    axum::serve(listener, app).await?;

    Ok(())
}
