//! Client application configuration.
//!
//! Loaded from environment variables once at startup.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default listen port when neither `BIND_ADDRESS` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3000;

/// Default public URL of this application.
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Default base URL of the resource server.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default directory holding `index.html`, `authConfig.js` and other assets.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Default timeout for proxied API calls, in seconds.
pub const DEFAULT_PROXY_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for `PROXY_TIMEOUT_SECONDS`.
pub const MAX_PROXY_TIMEOUT_SECONDS: u64 = 60;

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Substituted for `<APP_URL>` in `authConfig.js`.
    pub app_url: String,

    /// Substituted for `<API_URL>` and used as the proxy upstream.
    pub api_url: String,

    pub static_dir: PathBuf,

    /// Timeout for a proxied API call.
    pub proxy_timeout_seconds: u64,

    /// Graceful shutdown drain period.
    pub drain: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid URL for {0}: {1}")]
    InvalidUrl(String, String),

    #[error("Invalid proxy timeout: {0}")]
    InvalidProxyTimeout(String),
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

        let app_url = http_url(vars, "APP_URL", DEFAULT_APP_URL)?;
        let api_url = http_url(vars, "API_URL", DEFAULT_API_URL)?;

        let static_dir = vars
            .get("STATIC_DIR")
            .filter(|v| !v.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from);

        let proxy_timeout_seconds = if let Some(value_str) = vars.get("PROXY_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidProxyTimeout(format!(
                    "PROXY_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_PROXY_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidProxyTimeout(format!(
                    "PROXY_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                    MAX_PROXY_TIMEOUT_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_PROXY_TIMEOUT_SECONDS
        };

        let drain = common::shutdown::drain_period(vars.get("DRAIN_SECONDS").map(String::as_str));

        Ok(Config {
            bind_address,
            app_url,
            api_url,
            static_dir,
            proxy_timeout_seconds,
            drain,
        })
    }

    /// Timeout applied to each proxied API call.
    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_seconds)
    }

    /// Upstream endpoint the proxy forwards to.
    pub fn upstream_api_endpoint(&self) -> String {
        format!("{}/api", self.api_url)
    }
}

/// Read an http(s) URL, trimming any trailing slash so paths can be appended.
fn http_url(
    vars: &HashMap<String, String>,
    name: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let value = vars
        .get(name)
        .filter(|v| !v.is_empty())
        .map_or(default, String::as_str)
        .trim_end_matches('/');

    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl(
            name.to_string(),
            format!("expected an http:// or https:// URL, got '{}'", value),
        ));
    }

    Ok(value.to_string())
}
