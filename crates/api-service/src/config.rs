//! API service configuration.
//!
//! Configuration is loaded from environment variables once at startup and is
//! immutable afterwards. Tenant and client identifiers are redacted in Debug
//! output.

use common::jwt::{parse_scope_list, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default listen port when neither `BIND_ADDRESS` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 5000;

/// Default identity provider authority (host, optionally with scheme).
pub const DEFAULT_IDP_AUTHORITY: &str = "login.microsoftonline.com";

/// Default identity provider endpoint version.
pub const DEFAULT_IDP_VERSION: &str = "v2.0";

/// Default discovery document path, relative to `{authority}/{tenant}/{version}`.
pub const DEFAULT_IDP_DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// Scope required on `/api` unless `REQUIRED_SCOPES` overrides it.
pub const DEFAULT_REQUIRED_SCOPES: &str = "access_as_user";

/// Default JWKS cache TTL in seconds (24 hours).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 86_400;

/// Upper bound for `JWKS_CACHE_TTL_SECONDS` (7 days).
pub const MAX_JWKS_CACHE_TTL_SECONDS: u64 = 604_800;

/// Default timeout for discovery and JWKS fetches, in seconds.
pub const DEFAULT_IDP_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for `IDP_FETCH_TIMEOUT_SECONDS`.
pub const MAX_IDP_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// API service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Identity provider authority, e.g. "login.microsoftonline.com".
    pub idp_authority: String,

    /// Directory tenant identifier.
    pub tenant_id: String,

    /// Identity provider endpoint version, e.g. "v2.0".
    pub idp_version: String,

    /// Discovery document path relative to the issuer.
    pub idp_discovery_path: String,

    /// Application (client) identifier of this API's registration.
    pub client_id: String,

    /// Expected `aud` claim. Defaults to `client_id`.
    pub audience: String,

    /// Whether `iss` must equal the expected issuer.
    pub validate_issuer: bool,

    /// Whether `aud` must contain the expected audience.
    pub validate_audience: bool,

    /// Scopes of which at least one must be granted. Empty disables the check.
    pub required_scopes: BTreeSet<String>,

    /// Whether personally identifying claim values may be logged.
    pub log_pii: bool,

    /// JWT clock skew tolerance in seconds.
    pub jwt_clock_skew_seconds: u64,

    /// How long a fetched key set stays fresh.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for discovery and JWKS fetches.
    pub idp_fetch_timeout_seconds: u64,

    /// Graceful shutdown drain period.
    pub drain: Duration,
}

/// Custom Debug implementation that redacts tenant and client identifiers.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("idp_authority", &self.idp_authority)
            .field("tenant_id", &"[REDACTED]")
            .field("idp_version", &self.idp_version)
            .field("idp_discovery_path", &self.idp_discovery_path)
            .field("client_id", &"[REDACTED]")
            .field("audience", &"[REDACTED]")
            .field("validate_issuer", &self.validate_issuer)
            .field("validate_audience", &self.validate_audience)
            .field("required_scopes", &self.required_scopes)
            .field("log_pii", &self.log_pii)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("idp_fetch_timeout_seconds", &self.idp_fetch_timeout_seconds)
            .field("drain", &self.drain)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid boolean for {0}: {1}")]
    InvalidBool(String, String),

    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid identity provider fetch timeout: {0}")]
    InvalidFetchTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match (vars.get("BIND_ADDRESS"), vars.get("PORT")) {
            (Some(addr), _) => addr.clone(),
            (None, Some(port)) => {
                let port: u16 = port.parse().map_err(|e| {
                    ConfigError::InvalidPort(format!(
                        "PORT must be a valid port number, got '{}': {}",
                        port, e
                    ))
                })?;
                format!("0.0.0.0:{}", port)
            }
            (None, None) => format!("0.0.0.0:{}", DEFAULT_PORT),
        };

        let tenant_id = required(vars, "TENANT_ID")?;
        let client_id = required(vars, "CLIENT_ID")?;

        let idp_authority = vars
            .get("IDP_AUTHORITY")
            .cloned()
            .unwrap_or_else(|| DEFAULT_IDP_AUTHORITY.to_string());

        let idp_version = vars
            .get("IDP_VERSION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_IDP_VERSION.to_string());

        let idp_discovery_path = vars
            .get("IDP_DISCOVERY_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_IDP_DISCOVERY_PATH.to_string());

        // Without an explicit audience the token must be issued for this client
        let audience = vars
            .get("AUDIENCE")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| client_id.clone());

        let validate_issuer = parse_bool(vars, "VALIDATE_ISSUER", true)?;
        let validate_audience = parse_bool(vars, "VALIDATE_AUDIENCE", true)?;
        let log_pii = parse_bool(vars, "LOG_PII", false)?;

        let required_scopes = parse_scope_list(
            vars.get("REQUIRED_SCOPES")
                .map_or(DEFAULT_REQUIRED_SCOPES, String::as_str),
        );

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value as u64
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let jwks_cache_ttl_seconds = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwksCacheTtl(
                    "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_JWKS_CACHE_TTL_SECONDS {
                return Err(ConfigError::InvalidJwksCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must not exceed {} seconds, got {}",
                    MAX_JWKS_CACHE_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_JWKS_CACHE_TTL_SECONDS
        };

        let idp_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("IDP_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidFetchTimeout(format!(
                        "IDP_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_IDP_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidFetchTimeout(format!(
                        "IDP_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_IDP_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_IDP_FETCH_TIMEOUT_SECONDS
            };

        let drain = common::shutdown::drain_period(vars.get("DRAIN_SECONDS").map(String::as_str));

        Ok(Config {
            bind_address,
            idp_authority,
            tenant_id,
            idp_version,
            idp_discovery_path,
            client_id,
            audience,
            validate_issuer,
            validate_audience,
            required_scopes,
            log_pii,
            jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds,
            idp_fetch_timeout_seconds,
            drain,
        })
    }

    /// Issuer base URL: `{scheme}://{authority}/{tenant}/{version}`.
    ///
    /// The authority may carry an explicit `http://` or `https://` scheme;
    /// otherwise `https://` is assumed.
    pub fn issuer(&self) -> String {
        let authority = self.idp_authority.trim_end_matches('/');
        let base = if authority.starts_with("http://") || authority.starts_with("https://") {
            authority.to_string()
        } else {
            format!("https://{}", authority)
        };
        format!("{}/{}/{}", base, self.tenant_id, self.idp_version)
    }

    /// Discovery document URL: `{issuer}/{discovery_path}`.
    pub fn identity_metadata_url(&self) -> String {
        format!(
            "{}/{}",
            self.issuer(),
            self.idp_discovery_path.trim_start_matches('/')
        )
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidBool(name.to_string(), v)),
        },
    }
}
