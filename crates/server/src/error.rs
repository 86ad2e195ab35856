//! Structured errors for the sitesnap server.
//!
//! These map pipeline failures onto HTTP responses. Bodies stay generic;
//! the specific cause is logged, never exposed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::orchestrator::ServeError;

/// Errors a request can fail with at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed `url` query parameter.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The pipeline could not produce a screenshot.
    #[error(transparent)]
    Serve(#[from] ServeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "Invalid URL"),
            ApiError::Serve(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Unable to capture"),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_maps_to_400() {
        let response = ApiError::InvalidUrl("relative URL without a base".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_serve_error_maps_to_500() {
        let err = ApiError::Serve(ServeError::Capture(sitesnap_client::CaptureError::BrowserLaunch(
            "boom".into(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
