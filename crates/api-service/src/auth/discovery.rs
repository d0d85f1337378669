//! OIDC discovery document resolution.
//!
//! The discovery document is resolved once at startup; an unreachable or
//! malformed document aborts the process before it binds.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// The subset of the discovery document the validator needs.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcMetadata {
    /// Issuer identifier advertised by the identity provider.
    pub issuer: String,

    /// Location of the signing key set.
    pub jwks_uri: String,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid identity metadata URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("Discovery document unreachable: {0}")]
    Unreachable(String),

    #[error("Discovery document request returned HTTP {0}")]
    BadStatus(u16),

    #[error("Discovery document is invalid: {0}")]
    InvalidDocument(String),
}

/// Check that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<reqwest::Url, DiscoveryError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| DiscoveryError::InvalidUrl(url.to_string(), e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(DiscoveryError::InvalidUrl(
            url.to_string(),
            format!("unsupported scheme '{}'", other),
        )),
    }
}

/// Fetch and parse the discovery document at `metadata_url`.
///
/// The request timeout is whatever `http_client` was built with.
#[instrument(skip(http_client), name = "api.auth.discovery")]
pub async fn discover(
    http_client: &reqwest::Client,
    metadata_url: &str,
) -> Result<OidcMetadata, DiscoveryError> {
    let url = validate_url(metadata_url)?;

    let response = http_client
        .get(url)
        .send()
        .await
        .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DiscoveryError::BadStatus(response.status().as_u16()));
    }

    let metadata: OidcMetadata = response
        .json()
        .await
        .map_err(|e| DiscoveryError::InvalidDocument(e.to_string()))?;

    if metadata.jwks_uri.trim().is_empty() {
        return Err(DiscoveryError::InvalidDocument(
            "jwks_uri is empty".to_string(),
        ));
    }
    validate_url(&metadata.jwks_uri)
        .map_err(|e| DiscoveryError::InvalidDocument(e.to_string()))?;

    tracing::info!(
        target: "api.auth.discovery",
        issuer = %metadata.issuer,
        jwks_uri = %metadata.jwks_uri,
        "Resolved discovery document"
    );

    Ok(metadata)
}
