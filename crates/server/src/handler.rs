//! HTTP boundary for the capture endpoint.
//!
//! One route: `GET /` with a required `url` query parameter. URL validation
//! happens here; the orchestrator only ever sees well-formed absolute URLs.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use url::Url;

use crate::error::ApiError;
use crate::orchestrator::CaptureOrchestrator;

#[derive(Debug, Deserialize)]
pub struct ScreenshotQuery {
    url: String,
}

/// Build the service router around a shared orchestrator.
pub fn router(orchestrator: Arc<CaptureOrchestrator>) -> Router {
    Router::new().route("/", get(screenshot)).with_state(orchestrator)
}

/// Serve a PNG screenshot of the requested URL.
///
/// The response is identical for cache hits and misses.
async fn screenshot(
    State(orchestrator): State<Arc<CaptureOrchestrator>>, Query(query): Query<ScreenshotQuery>,
) -> Result<Response, ApiError> {
    let url = parse_target(&query.url)?;

    let served = orchestrator.serve(&url).await.map_err(|err| {
        tracing::error!(%url, error = %err, "request failed");
        ApiError::from(err)
    })?;

    tracing::debug!(%url, outcome = ?served.outcome, bytes = served.bytes.len(), "serving screenshot");
    Ok(([(header::CONTENT_TYPE, "image/png")], served.bytes).into_response())
}

/// Accept only absolute http(s) URLs with a host.
fn parse_target(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(ApiError::InvalidUrl("missing host".into()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::MockCapturer;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    const WINDOW: Duration = Duration::from_secs(60 * 60 * 24);

    async fn app(dir: &std::path::Path, capturer: Arc<MockCapturer>) -> Router {
        let (orchestrator, _) = crate::orchestrator::testing::orchestrator_with(dir, capturer, WINDOW).await;
        router(Arc::new(orchestrator))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[test]
    fn test_parse_target_rejects_non_http_schemes() {
        assert!(parse_target("file:///etc/passwd").is_err());
        assert!(parse_target("data:text/plain,hi").is_err());
        assert!(parse_target("not a url").is_err());
        assert!(parse_target("https://example.com").is_ok());
    }

    #[tokio::test]
    async fn test_screenshot_round_trip_creates_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let png = b"\x89PNG\r\n\x1a\nrest-of-image";
        let app = app(dir.path(), Arc::new(MockCapturer::returning(png))).await;

        let response = app
            .oneshot(Request::builder().uri("/?url=https://example.com").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(body_bytes(response).await, png);

        let artifact = std::fs::read(dir.path().join("example.com.png")).unwrap();
        assert_eq!(artifact, png);
    }

    #[tokio::test]
    async fn test_missing_url_param_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(MockCapturer::returning(b"png"))).await;

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_url_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = Arc::new(MockCapturer::returning(b"png"));
        let app = app(dir.path(), capturer.clone()).await;

        let response = app
            .oneshot(Request::builder().uri("/?url=not-a-url").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(response).await, b"Invalid URL");
        assert_eq!(capturer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_failure_is_generic_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(MockCapturer::failing())).await;

        let response = app
            .oneshot(Request::builder().uri("/?url=https://example.com").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The body must not leak the underlying cause.
        assert_eq!(body_bytes(response).await, b"Unable to capture");
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = Arc::new(MockCapturer::returning(b"png-bytes"));
        let app = app(dir.path(), capturer.clone()).await;

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/?url=https://example.com").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_bytes(response).await, b"png-bytes");
        }

        assert_eq!(capturer.call_count(), 1);
    }
}
