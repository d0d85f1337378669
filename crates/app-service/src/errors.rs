//! Client application error types.
//!
//! Upstream failure details stay in the logs; clients see a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Client application error type.
///
/// Maps to HTTP status codes:
/// - NotFound: 404 Not Found
/// - BadGateway: 502 Bad Gateway
/// - GatewayTimeout: 504 Gateway Timeout
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream request failed: {0}")]
    BadGateway(String),

    #[error("Upstream request timed out: {0}")]
    GatewayTimeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::BadGateway(_) => 502,
            AppError::GatewayTimeout(_) => 504,
            AppError::Internal(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource),
            AppError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "The API request failed".to_string(),
            ),
            AppError::GatewayTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "GATEWAY_TIMEOUT",
                "The API did not respond in time".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(AppError::BadGateway("x".to_string()).status_code(), 502);
        assert_eq!(AppError::GatewayTimeout("x".to_string()).status_code(), 504);
        assert_eq!(AppError::Internal("x".to_string()).status_code(), 500);
    }

    #[tokio::test]
    async fn test_bad_gateway_hides_upstream_detail() {
        let response =
            AppError::BadGateway("connect error: 10.0.0.7:5000".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_GATEWAY");
        assert!(!body_json.to_string().contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_gateway_timeout_response() {
        let response = AppError::GatewayTimeout("5s elapsed".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "GATEWAY_TIMEOUT");
    }

    #[tokio::test]
    async fn test_not_found_keeps_resource() {
        let response = AppError::NotFound("authConfig.js".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["message"], "authConfig.js");
    }
}
