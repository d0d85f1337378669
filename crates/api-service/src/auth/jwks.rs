//! JWKS client for fetching and caching identity provider signing keys.
//!
//! Key sets are cached per issuer with a configurable TTL. Refreshes are
//! single-flight: requests that find the cache stale queue on one refresh
//! gate, and only the first of them fetches. The others reuse its result,
//! including a failure that completed while they were queued.
//!
//! # Security
//!
//! - Keys are cached to avoid a fetch per request
//! - Cache is invalidated on TTL expiry to pick up key rotations
//! - An unknown `kid` against a fresh cache triggers at most one refresh per
//!   minimum refresh interval, so forged `kid` values cannot hammer the IdP

use crate::auth::error::AuthError;
use crate::observability::metrics;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (24 hours).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 86_400;

/// Minimum age of a cached key set before an unknown `kid` may force a refresh.
const DEFAULT_MIN_REFRESH_INTERVAL_SECONDS: u64 = 60;

/// Default timeout for a JWKS fetch.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// JSON Web Key from the JWKS endpoint.
///
/// Only the members used for RSA and OKP signature verification are kept;
/// provider extras such as `x5c`, `x5t` and `issuer` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    ///
    /// Keys published without one can never be selected and are skipped.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm, when the provider pins one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// OKP curve name ("Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,
}

/// JWKS response document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Where an issuer's keys are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySource {
    /// Issuer the keys belong to; the cache key.
    pub issuer: String,

    /// JWKS document URL, from the discovery document.
    pub jwks_uri: String,
}

/// Cached JWKS data with its fetch time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this entry was fetched; doubles as its generation marker.
    fetched_at: Instant,
}

/// Most recent failed fetch for an issuer.
struct FailedFetch {
    finished_at: Instant,
    error: String,
}

/// Result of a cache lookup.
enum Lookup {
    Hit(Jwk),
    /// Fresh entry that does not contain the kid.
    Miss { fetched_at: Instant },
    Stale { fetched_at: Instant },
    Empty,
}

/// JWKS client for fetching and caching public keys.
pub struct JwksClient {
    /// HTTP client for fetching JWKS (carries the fetch timeout).
    http_client: reqwest::Client,

    /// Cached key sets, keyed by issuer.
    cache: RwLock<HashMap<String, CachedJwks>>,

    /// Held for the duration of a refresh so concurrent refreshes coalesce.
    /// Guards the last failed fetch per issuer.
    refresh_gate: Mutex<HashMap<String, FailedFetch>>,

    /// Cache TTL duration.
    cache_ttl: Duration,

    /// Minimum cache age before an unknown kid forces a refresh.
    min_refresh_interval: Duration,
}

impl Default for JwksClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksClient {
    /// Create a new JWKS client with default TTL and fetch timeout.
    pub fn new() -> Self {
        Self::with_settings(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        )
    }

    /// Create a new JWKS client with custom cache TTL and fetch timeout.
    ///
    /// # Arguments
    ///
    /// * `cache_ttl` - How long a fetched key set stays fresh
    /// * `fetch_timeout` - Upper bound on a single JWKS fetch
    pub fn with_settings(cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "api.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            http_client,
            cache: RwLock::new(HashMap::new()),
            refresh_gate: Mutex::new(HashMap::new()),
            cache_ttl,
            min_refresh_interval: Duration::from_secs(DEFAULT_MIN_REFRESH_INTERVAL_SECONDS),
        }
    }

    /// Override the minimum refresh interval for unknown kids.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get a JWK by key ID.
    ///
    /// Returns the cached JWK when fresh, otherwise refreshes the issuer's key
    /// set first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the JWKS cannot be fetched.
    /// Returns `AuthError::UnknownKey` if the key ID is not published.
    #[instrument(skip(self, source), fields(issuer = %source.issuer, kid = %kid))]
    pub async fn get_key(&self, source: &KeySource, kid: &str) -> Result<Jwk, AuthError> {
        let observed = match self.lookup(&source.issuer, kid).await {
            Lookup::Hit(key) => {
                tracing::debug!(target: "api.auth.jwks", kid = %kid, "JWKS cache hit");
                return Ok(key);
            }
            Lookup::Miss { fetched_at } => {
                if fetched_at.elapsed() < self.min_refresh_interval {
                    tracing::debug!(target: "api.auth.jwks", kid = %kid, "Key not found in JWKS cache");
                    return Err(AuthError::UnknownKey(kid.to_string()));
                }
                Some(fetched_at)
            }
            Lookup::Stale { fetched_at } => Some(fetched_at),
            Lookup::Empty => None,
        };

        self.refresh(source, observed).await?;

        match self.lookup(&source.issuer, kid).await {
            Lookup::Hit(key) => Ok(key),
            _ => {
                tracing::warn!(target: "api.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
                Err(AuthError::UnknownKey(kid.to_string()))
            }
        }
    }

    async fn lookup(&self, issuer: &str, kid: &str) -> Lookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.get(issuer) else {
            return Lookup::Empty;
        };

        if cached.fetched_at.elapsed() >= self.cache_ttl {
            return Lookup::Stale {
                fetched_at: cached.fetched_at,
            };
        }

        match cached.keys.get(kid) {
            Some(key) => Lookup::Hit(key.clone()),
            None => Lookup::Miss {
                fetched_at: cached.fetched_at,
            },
        }
    }

    /// Refresh the issuer's key set unless another task already did.
    ///
    /// `observed` is the `fetched_at` of the entry the caller saw before
    /// queuing on the gate; a different value means the entry was replaced
    /// while waiting. A fetch that failed after the caller queued is
    /// reported to it instead of being retried.
    async fn refresh(
        &self,
        source: &KeySource,
        observed: Option<Instant>,
    ) -> Result<(), AuthError> {
        let queued_at = Instant::now();
        let mut failures = self.refresh_gate.lock().await;

        let current = self
            .cache
            .read()
            .await
            .get(&source.issuer)
            .map(|cached| cached.fetched_at);
        if current.is_some() && current != observed {
            tracing::debug!(target: "api.auth.jwks", "JWKS refreshed by concurrent request");
            return Ok(());
        }

        if let Some(failed) = failures.get(&source.issuer) {
            if failed.finished_at >= queued_at {
                tracing::debug!(target: "api.auth.jwks", "JWKS fetch failed for concurrent request");
                return Err(AuthError::KeySetUnavailable(failed.error.clone()));
            }
        }

        let keys = match self.fetch(source).await {
            Ok(keys) => keys,
            Err(e) => {
                let error = match &e {
                    AuthError::KeySetUnavailable(reason) => reason.clone(),
                    other => other.to_string(),
                };
                failures.insert(
                    source.issuer.clone(),
                    FailedFetch {
                        finished_at: Instant::now(),
                        error,
                    },
                );
                return Err(e);
            }
        };
        failures.remove(&source.issuer);

        let mut cache = self.cache.write().await;
        cache.insert(
            source.issuer.clone(),
            CachedJwks {
                keys,
                fetched_at: Instant::now(),
            },
        );

        Ok(())
    }

    #[instrument(skip(self, source), fields(jwks_uri = %source.jwks_uri))]
    async fn fetch(&self, source: &KeySource) -> Result<HashMap<String, Jwk>, AuthError> {
        let start = Instant::now();
        let result = self.fetch_keys(source).await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_jwks_fetch(status, start.elapsed());
        result
    }

    async fn fetch_keys(&self, source: &KeySource) -> Result<HashMap<String, Jwk>, AuthError> {
        tracing::debug!(target: "api.auth.jwks", url = %source.jwks_uri, "Fetching JWKS");

        let response = self
            .http_client
            .get(&source.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "api.auth.jwks", error = %e, timeout = e.is_timeout(), "Failed to fetch JWKS");
                AuthError::KeySetUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "api.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable(e.to_string())
        })?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
            .collect();

        tracing::info!(
            target: "api.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        Ok(keys)
    }

    /// Drop every cached key set.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}
