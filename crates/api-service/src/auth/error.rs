//! Authentication failure causes.
//!
//! Every variant maps to the same 401 response (see `ApiError`). The variants
//! exist so logs and metrics can tell a missing header from a bad signature.

use common::jwt::JwtValidationError;
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not a Bearer credential")]
    MalformedHeader,

    #[error("token is not a well-formed JWT")]
    MalformedToken,

    #[error("no signing key published for kid {0}")]
    UnknownKey(String),

    #[error("signing key does not match token algorithm")]
    KeyMismatch,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token issued in the future")]
    IssuedInFuture,

    #[error("token issuer does not match")]
    IssuerMismatch,

    #[error("token audience does not match")]
    AudienceMismatch,

    #[error("token grants none of the required scopes")]
    InsufficientScope,

    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl AuthError {
    /// Bounded label for the `outcome` metric dimension.
    pub fn metric_label(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownKey(_) => "unknown_key",
            AuthError::KeyMismatch => "key_mismatch",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::IssuedInFuture => "issued_in_future",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::InsufficientScope => "insufficient_scope",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::IatTooFarInFuture => AuthError::IssuedInFuture,
            JwtValidationError::TokenTooLarge
            | JwtValidationError::MalformedToken
            | JwtValidationError::MissingKid
            | JwtValidationError::UnsupportedAlgorithm => AuthError::MalformedToken,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::ImmatureSignature => AuthError::NotYetValid,
            ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
            ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => AuthError::KeyMismatch,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedToken,
            _ => AuthError::InvalidSignature,
        }
    }
}
