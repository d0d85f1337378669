//! JWT utilities shared by the sample services.
//!
//! This module provides the pre-verification helpers used before a token's
//! signature is checked:
//! - Size limits for DoS prevention
//! - Clock skew constants for `iat`/`exp`/`nbf` validation
//! - Header inspection (`kid` and `alg`) for JWKS lookup
//! - `iat` validation logic
//! - Space-delimited scope helpers
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the algorithms in [`SUPPORTED_ALGORITHMS`] are accepted
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{inspect_header, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! // Size check + kid/alg extraction, no signature verification yet
//! let header = inspect_header(token)?;
//! let key = jwks.get_key(&header.kid).await?;
//!
//! // After signature verification, validate iat
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Identity-provider access tokens are typically
/// 1-2KB (RS256 signature plus group/role claims).
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Applied as leeway to `exp`/`nbf` and as the future tolerance for `iat`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Signing algorithms accepted from bearer tokens.
///
/// RSA variants cover identity-provider issued tokens; `EdDSA` covers
/// OKP keys. HMAC algorithms are never accepted since the key set is public.
pub const SUPPORTED_ALGORITHMS: [Algorithm; 4] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::EdDSA,
];

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// Note: Display messages are intentionally generic. Callers log the variant
/// at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token `alg` header is missing or not in [`SUPPORTED_ALGORITHMS`].
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Header Inspection
// =============================================================================

/// The parts of a JWT header needed to select a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Key ID used to look up the signing key in the JWKS.
    pub kid: String,

    /// Declared signing algorithm (already checked against the allowlist).
    pub alg: Algorithm,
}

/// Inspect a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value must only be used for lookup in a trusted JWKS
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON
/// - `MissingKid` - Header has no non-empty string `kid`
/// - `UnsupportedAlgorithm` - `alg` missing, unknown, or not allowlisted
pub fn inspect_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .get("alg")
        .and_then(|v| v.as_str())
        .and_then(|s| Algorithm::from_str(s).ok())
        .filter(|alg| SUPPORTED_ALGORITHMS.contains(alg))
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", alg = ?header.get("alg"), "Token rejected: unsupported alg");
            JwtValidationError::UnsupportedAlgorithm
        })?;

    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader { kid, alg })
}

// =============================================================================
// Claim Checks
// =============================================================================

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds)
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Split a space-delimited scope claim into individual scopes.
pub fn scopes(scope_claim: &str) -> impl Iterator<Item = &str> {
    scope_claim.split_whitespace()
}

/// Whether `scope_claim` grants at least one of `required`.
///
/// An empty `required` set means scope enforcement is disabled and always
/// returns `true`.
#[must_use]
pub fn has_any_scope(scope_claim: &str, required: &BTreeSet<String>) -> bool {
    required.is_empty() || scopes(scope_claim).any(|s| required.contains(s))
}

/// Parse a scope list from configuration.
///
/// Accepts space- and/or comma-separated values; empty entries are dropped.
#[must_use]
pub fn parse_scope_list(value: &str) -> BTreeSet<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_is_5_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
    }

    #[test]
    fn test_hmac_is_not_supported() {
        assert!(!SUPPORTED_ALGORITHMS.contains(&Algorithm::HS256));
    }

    // -------------------------------------------------------------------------
    // inspect_header Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_inspect_header_rs256() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"nOo3ZDrODXEK1jKWhXslHR_KXEg"}"#);

        let header = inspect_header(&token).unwrap();
        assert_eq!(header.kid, "nOo3ZDrODXEK1jKWhXslHR_KXEg");
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn test_inspect_header_eddsa() {
        let token = token_with_header(r#"{"alg":"EdDSA","kid":"test-key-01"}"#);

        let header = inspect_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::EdDSA);
    }

    #[test]
    fn test_inspect_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(inspect_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_inspect_header_empty_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert_eq!(inspect_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_inspect_header_non_string_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        assert_eq!(inspect_header(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_inspect_header_rejects_hs256() {
        let token = token_with_header(r#"{"alg":"HS256","kid":"k"}"#);
        assert_eq!(
            inspect_header(&token),
            Err(JwtValidationError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_inspect_header_rejects_none_alg() {
        let token = token_with_header(r#"{"alg":"none","kid":"k"}"#);
        assert_eq!(
            inspect_header(&token),
            Err(JwtValidationError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_inspect_header_malformed_token() {
        assert_eq!(
            inspect_header("not-a-jwt"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            inspect_header("only.two"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            inspect_header("a.b.c.d"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(inspect_header(""), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_inspect_header_invalid_base64() {
        assert_eq!(
            inspect_header("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_inspect_header_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(inspect_header(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_inspect_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            inspect_header(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_inspect_header_at_size_limit() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key"}"#);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2;
        let payload_len = remaining / 2;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(remaining - payload_len)
        );
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        assert_eq!(inspect_header(&token).unwrap().kid, "key");
    }

    // -------------------------------------------------------------------------
    // validate_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_past_time() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now - 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_at_clock_skew_boundary() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_beyond_clock_skew() {
        let now = 1_700_000_000;
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_validate_iat_current_time() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_iat(now, DEFAULT_CLOCK_SKEW).is_ok());
    }

    // -------------------------------------------------------------------------
    // Scope Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_has_any_scope_overlap() {
        let required = parse_scope_list("access_as_user");
        assert!(has_any_scope("openid access_as_user", &required));
        assert!(!has_any_scope("openid profile", &required));
    }

    #[test]
    fn test_has_any_scope_no_partial_match() {
        let required = parse_scope_list("access_as_user");
        assert!(!has_any_scope("access_as_user_admin", &required));
    }

    #[test]
    fn test_has_any_scope_empty_required_disables_check() {
        assert!(has_any_scope("", &BTreeSet::new()));
    }

    #[test]
    fn test_has_any_scope_empty_claim() {
        let required = parse_scope_list("read");
        assert!(!has_any_scope("", &required));
    }

    #[test]
    fn test_parse_scope_list_mixed_separators() {
        let scopes = parse_scope_list("read, write  admin,,");
        assert_eq!(
            scopes.into_iter().collect::<Vec<_>>(),
            vec!["admin", "read", "write"]
        );
    }

    #[test]
    fn test_parse_scope_list_empty() {
        assert!(parse_scope_list("").is_empty());
        assert!(parse_scope_list(" , ").is_empty());
    }

    #[test]
    fn test_decode_ed25519_public_key_jwk() {
        let bytes = decode_ed25519_public_key_jwk("dGVzdC1rZXk").unwrap();
        assert_eq!(bytes, b"test-key");
    }

    #[test]
    fn test_decode_ed25519_public_key_jwk_invalid() {
        assert!(decode_ed25519_public_key_jwk("!!!").is_err());
    }
}
