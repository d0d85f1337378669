//! Bearer token authentication for the API service.
//!
//! Validates incoming JWTs against the signing keys published by the
//! identity provider's discovery document.
//!
//! # Components
//!
//! - `discovery` - OIDC discovery document resolution (startup only)
//! - `jwks` - Issuer-keyed, TTL-bound, single-flight signing key cache
//! - `jwt` - Token validation (signature, lifetime, issuer, audience, scope)
//! - `claims` - Claims carried by validated tokens
//! - `error` - Authentication failure causes

pub mod claims;
pub mod discovery;
pub mod error;
pub mod jwks;
pub mod jwt;

pub use claims::{Audience, Claims};
pub use discovery::{DiscoveryError, OidcMetadata};
pub use error::AuthError;
pub use jwks::{JwksClient, KeySource};
pub use jwt::{JwtValidator, ValidationConfig};
