//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, validates it with
//! the `JwtValidator`, and injects claims into request extensions.

use crate::auth::{AuthError, JwtValidator};
use crate::errors::ApiError;
use crate::observability::metrics::record_token_validation;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token validator with JWKS client.
    pub jwt_validator: Arc<JwtValidator>,
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// The scheme name is matched case-insensitively (RFC 7235).
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthError::MalformedHeader);
    }

    Some(token.trim())
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if token is missing or invalid
/// - Continues to next handler with claims in extensions if token is valid
#[instrument(skip_all, name = "api.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let result = match extract_bearer_token(req.headers()) {
        Ok(token) => state.jwt_validator.validate(token).await,
        Err(e) => Err(e),
    };

    let claims = match result {
        Ok(claims) => {
            record_token_validation("success");
            claims
        }
        Err(e) => {
            record_token_validation(e.metric_label());
            return Err(ApiError::from(e));
        }
    };

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    // Full middleware tests need a mocked identity provider and live in
    // tests/auth_tests.rs.

    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[test]
    fn test_extract_bearer_token() {
        let headers = headers_with("Bearer eyJhbGciOi.payload.sig");
        assert_eq!(
            extract_bearer_token(&headers).unwrap(),
            "eyJhbGciOi.payload.sig"
        );
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        assert!(matches!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        assert!(matches!(
            extract_bearer_token(&headers_with("Basic dXNlcjpwYXNz")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            extract_bearer_token(&headers_with("Bearertoken")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn test_extract_bearer_token_scheme_is_case_insensitive() {
        for value in ["bearer abc.def.ghi", "BEARER abc.def.ghi", "bEaReR abc.def.ghi"] {
            assert_eq!(
                extract_bearer_token(&headers_with(value)).unwrap(),
                "abc.def.ghi",
                "{} should be accepted",
                value
            );
        }
    }

    #[test]
    fn test_extract_bearer_token_empty_token() {
        assert!(matches!(
            extract_bearer_token(&headers_with("Bearer ")),
            Err(AuthError::MalformedHeader)
        ));
    }
}
