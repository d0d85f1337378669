//! API service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Generic message for every authentication failure.
pub const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// API service error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - NotFound: 404 Not Found
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidToken(_) => 401,
            ApiError::NotFound(_) => 404,
        }
    }
}

/// Every authentication failure surfaces as the same 401.
///
/// The specific cause is logged here so the middleware stays a thin pipeline.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::MissingHeader => {
                tracing::debug!(target: "api.auth", error = %err, "Rejecting request");
                ApiError::InvalidToken("Missing Authorization header".to_string())
            }
            AuthError::MalformedHeader => {
                tracing::debug!(target: "api.auth", error = %err, "Rejecting request");
                ApiError::InvalidToken("Invalid Authorization header format".to_string())
            }
            AuthError::KeySetUnavailable(_) => {
                tracing::warn!(target: "api.auth", error = %err, "Rejecting request");
                ApiError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
            }
            _ => {
                tracing::debug!(target: "api.auth", error = %err, "Rejecting request");
                ApiError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            ApiError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"api\", error=\"invalid_token\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
