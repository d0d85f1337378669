//! Bearer token validation.
//!
//! Validates access tokens against the signing keys published by the
//! identity provider named in the discovery document.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256/RS384/RS512 and EdDSA are accepted; the JWK must agree with
//!   the token header on algorithm and key type
//! - `exp`, `nbf` and `iat` are validated with clock skew tolerance
//! - Issuer and audience checks are individually switchable
//! - Claim values are only logged when PII logging is enabled

use crate::auth::claims::Claims;
use crate::auth::discovery::{self, DiscoveryError};
use crate::auth::error::AuthError;
use crate::auth::jwks::{Jwk, JwksClient, KeySource};
use crate::config::Config;
use common::jwt::{decode_ed25519_public_key_jwk, inspect_header, validate_iat, TokenHeader};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Settings that govern token validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Discovery document URL.
    pub identity_metadata_url: String,

    /// Issuer tokens must carry when `validate_issuer` is set.
    pub expected_issuer: String,

    /// Audience tokens must carry when `validate_audience` is set.
    pub expected_audience: String,

    pub validate_issuer: bool,

    pub validate_audience: bool,

    /// At least one of these must be granted; empty disables the check.
    pub required_scopes: BTreeSet<String>,

    /// Leeway applied to `exp`, `nbf` and `iat`.
    pub clock_skew: Duration,

    pub jwks_cache_ttl: Duration,

    /// Timeout for discovery and JWKS fetches.
    pub fetch_timeout: Duration,

    pub log_pii: bool,
}

impl ValidationConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            identity_metadata_url: config.identity_metadata_url(),
            expected_issuer: config.issuer(),
            expected_audience: config.audience.clone(),
            validate_issuer: config.validate_issuer,
            validate_audience: config.validate_audience,
            required_scopes: config.required_scopes.clone(),
            clock_skew: Duration::from_secs(config.jwt_clock_skew_seconds),
            jwks_cache_ttl: Duration::from_secs(config.jwks_cache_ttl_seconds),
            fetch_timeout: Duration::from_secs(config.idp_fetch_timeout_seconds),
            log_pii: config.log_pii,
        }
    }
}

/// Validates bearer tokens against an identity provider's key set.
pub struct JwtValidator {
    config: ValidationConfig,

    /// Issuer and JWKS location resolved from discovery.
    key_source: KeySource,

    /// JWKS client for fetching public keys.
    jwks_client: Arc<JwksClient>,
}

impl JwtValidator {
    /// Create a validator from an already-resolved key source.
    ///
    /// # Arguments
    ///
    /// * `config` - Validation settings
    /// * `key_source` - Issuer and JWKS URL to fetch keys from
    /// * `jwks_client` - Client for fetching public keys
    pub fn new(
        config: ValidationConfig,
        key_source: KeySource,
        jwks_client: Arc<JwksClient>,
    ) -> Self {
        Self {
            config,
            key_source,
            jwks_client,
        }
    }

    /// Resolve the discovery document and build a validator from it.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError` if the document cannot be fetched or parsed.
    pub async fn discover(config: ValidationConfig) -> Result<Self, DiscoveryError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

        let metadata = discovery::discover(&http_client, &config.identity_metadata_url).await?;

        if metadata.issuer != config.expected_issuer {
            tracing::warn!(
                target: "api.auth.jwt",
                discovered = %metadata.issuer,
                expected = %config.expected_issuer,
                "Discovery document issuer differs from configured issuer"
            );
        }

        let key_source = KeySource {
            issuer: config.expected_issuer.clone(),
            jwks_uri: metadata.jwks_uri,
        };
        let jwks_client = Arc::new(JwksClient::with_settings(
            config.jwks_cache_ttl,
            config.fetch_timeout,
        ));

        Ok(Self::new(config, key_source, jwks_client))
    }

    pub fn key_source(&self) -> &KeySource {
        &self.key_source
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check and header inspection (`kid`, allowlisted `alg`)
    /// 2. Key lookup in the issuer's JWKS
    /// 3. Signature, `exp`, `nbf`, issuer and audience verification
    /// 4. `iat` validation with clock skew tolerance
    /// 5. Required scope check
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` naming the first check that failed. Callers
    /// must not expose the cause to clients.
    #[instrument(skip_all, name = "api.auth.validate")]
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let header = inspect_header(token)?;

        let jwk = self.jwks_client.get_key(&self.key_source, &header.kid).await?;

        let claims = verify_token(token, &header, &jwk, &self.config)?;

        if let Some(iat) = claims.iat {
            validate_iat(iat, self.config.clock_skew)?;
        }

        if !claims.has_any_scope(&self.config.required_scopes) {
            return Err(AuthError::InsufficientScope);
        }

        if self.config.log_pii {
            tracing::debug!(target: "api.auth.jwt", name = %claims.name, kid = %header.kid, "Token validated successfully");
        } else {
            tracing::debug!(target: "api.auth.jwt", kid = %header.kid, "Token validated successfully");
        }

        Ok(claims)
    }
}

/// Verify the signature and registered claims of `token` with `jwk`.
fn verify_token(
    token: &str,
    header: &TokenHeader,
    jwk: &Jwk,
    config: &ValidationConfig,
) -> Result<Claims, AuthError> {
    let decoding_key = decoding_key(jwk, header.alg)?;

    let mut validation = Validation::new(header.alg);
    validation.leeway = config.clock_skew.as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    if config.validate_issuer {
        validation.set_issuer(&[&config.expected_issuer]);
    }
    if config.validate_audience {
        validation.set_audience(&[&config.expected_audience]);
    } else {
        validation.validate_aud = false;
    }

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "api.auth.jwt", error = %e, "Token verification failed");
        AuthError::from(e)
    })?;

    Ok(token_data.claims)
}

/// Build a decoding key from `jwk`, checking it is usable for `alg`.
fn decoding_key(jwk: &Jwk, alg: Algorithm) -> Result<DecodingKey, AuthError> {
    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            tracing::warn!(target: "api.auth.jwt", kid = ?jwk.kid, key_use = %key_use, "JWK is not a signing key");
            return Err(AuthError::KeyMismatch);
        }
    }

    if let Some(jwk_alg) = &jwk.alg {
        if Algorithm::from_str(jwk_alg).ok() != Some(alg) {
            tracing::warn!(target: "api.auth.jwt", kid = ?jwk.kid, jwk_alg = %jwk_alg, token_alg = ?alg, "JWK algorithm does not match token");
            return Err(AuthError::KeyMismatch);
        }
    }

    match (jwk.kty.as_str(), alg) {
        ("RSA", Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512) => {
            let (Some(n), Some(e)) = (&jwk.n, &jwk.e) else {
                tracing::error!(target: "api.auth.jwt", kid = ?jwk.kid, "RSA JWK missing n or e");
                return Err(AuthError::KeyMismatch);
            };
            DecodingKey::from_rsa_components(n, e).map_err(|err| {
                tracing::error!(target: "api.auth.jwt", error = %err, "Invalid RSA key components");
                AuthError::KeyMismatch
            })
        }
        ("OKP", Algorithm::EdDSA) => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                tracing::warn!(target: "api.auth.jwt", kid = ?jwk.kid, crv = ?jwk.crv, "Unsupported OKP curve");
                return Err(AuthError::KeyMismatch);
            }
            let x = jwk.x.as_ref().ok_or_else(|| {
                tracing::error!(target: "api.auth.jwt", kid = ?jwk.kid, "JWK missing x field");
                AuthError::KeyMismatch
            })?;
            let public_key_bytes = decode_ed25519_public_key_jwk(x).map_err(|err| {
                tracing::error!(target: "api.auth.jwt", error = %err, "Invalid public key encoding");
                AuthError::KeyMismatch
            })?;
            Ok(DecodingKey::from_ed_der(&public_key_bytes))
        }
        (kty, _) => {
            tracing::warn!(target: "api.auth.jwt", kid = ?jwk.kid, kty = %kty, token_alg = ?alg, "JWK key type does not match token algorithm");
            Err(AuthError::KeyMismatch)
        }
    }
}
