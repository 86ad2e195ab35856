//! Headless browser screenshot capture.
//!
//! This module provides a capturer trait and an implementation using
//! chromiumoxide for headless Chromium control. Every capture launches an
//! isolated browser and tears it down unconditionally when done, so nothing
//! leaks across requests.

use std::time::Duration;

use bytes::Bytes;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

/// Errors that can occur while capturing a screenshot.
///
/// Callers only need to know that capture failed; the variants exist for the
/// logs, not for branching.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Failed to launch or connect to the browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to the URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to rasterize the loaded page.
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// The page did not finish loading in time.
    #[error("capture timeout after {0}ms")]
    Timeout(u64),
}

/// Options for a single capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Viewport dimensions in pixels.
    pub viewport: (u32, u32),

    /// Bound on the whole navigate-and-capture sequence.
    pub timeout: Duration,

    /// Extra wait after the load event so late in-flight requests can settle.
    pub settle: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self { viewport: (1366, 768), timeout: Duration::from_millis(30_000), settle: Duration::from_millis(500) }
    }
}

/// Capturer trait for rendering a URL to PNG bytes.
#[async_trait::async_trait]
pub trait Capturer: Send + Sync {
    /// Render `url` in an isolated browsing session and return the PNG.
    async fn capture(&self, url: &Url, opts: &CaptureOptions) -> Result<Bytes, CaptureError>;
}

/// Headless Chromium capturer using chromiumoxide.
///
/// Launches a fresh browser per call; there is no pooling or reuse, so every
/// miss pays full launch cost.
pub struct ChromiumCapturer {
    no_sandbox: bool,
}

impl ChromiumCapturer {
    /// Create a capturer. `no_sandbox` disables the Chromium sandbox, which
    /// some container runtimes require.
    pub fn new(no_sandbox: bool) -> Self {
        Self { no_sandbox }
    }

    async fn launch(&self, viewport: (u32, u32)) -> Result<(Browser, JoinHandle<()>), CaptureError> {
        let (width, height) = viewport;
        let mut config = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });
        if self.no_sandbox {
            config = config.no_sandbox();
        }

        let (browser, mut handler) = Browser::launch(config.build().map_err(CaptureError::BrowserLaunch)?)
            .await
            .map_err(|e| CaptureError::BrowserLaunch(e.to_string()))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok((browser, events))
    }
}

#[async_trait::async_trait]
impl Capturer for ChromiumCapturer {
    async fn capture(&self, url: &Url, opts: &CaptureOptions) -> Result<Bytes, CaptureError> {
        let (mut browser, events) = self.launch(opts.viewport).await?;

        let result = tokio::time::timeout(opts.timeout, navigate_and_snap(&browser, url, opts.settle)).await;

        // Teardown happens on every path, including timeout.
        browser.close().await.ok();
        browser.wait().await.ok();
        events.abort();

        match result {
            Ok(snap) => snap,
            Err(_) => Err(CaptureError::Timeout(opts.timeout.as_millis() as u64)),
        }
    }
}

/// Navigate, wait for the page to finish loading plus a settle delay, and
/// capture a full-page PNG. The settle delay stands in for a network-idle
/// condition: the load event has fired and stragglers get a bounded grace
/// period, not an unbounded quiet-network wait.
async fn navigate_and_snap(browser: &Browser, url: &Url, settle: Duration) -> Result<Bytes, CaptureError> {
    let page = browser
        .new_page(url.as_str())
        .await
        .map_err(|e| CaptureError::Navigation(e.to_string()))?;

    page.wait_for_navigation()
        .await
        .map_err(|e| CaptureError::Navigation(e.to_string()))?;

    tokio::time::sleep(settle).await;

    let png = page
        .screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build(),
        )
        .await
        .map_err(|e| CaptureError::Screenshot(e.to_string()))?;

    page.close().await.ok();
    Ok(Bytes::from(png))
}
