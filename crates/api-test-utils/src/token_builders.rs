//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating access token claims.

use crate::identity_provider::{MockIdentityProvider, TEST_CLIENT_ID};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Scope granted by default, matching the service's default requirement.
pub const DEFAULT_TEST_SCOPE: &str = "access_as_user";

/// Builder for creating test access token claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::for_provider(&idp)
///     .for_user("Megan Bowen")
///     .with_scope("openid access_as_user")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    name: Option<String>,
    sub: String,
    iss: String,
    aud: Value,
    scp: Option<String>,
    exp: i64,
    iat: Option<i64>,
    nbf: Option<i64>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            name: Some("Test User".to_string()),
            sub: "test-subject".to_string(),
            iss: "https://login.microsoftonline.com/test-tenant/v2.0".to_string(),
            aud: json!(TEST_CLIENT_ID),
            scp: Some(DEFAULT_TEST_SCOPE.to_string()),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: Some(now.timestamp()),
            nbf: None,
        }
    }

    /// Defaults whose issuer matches `idp`.
    pub fn for_provider(idp: &MockIdentityProvider) -> Self {
        Self::new().issued_by(&idp.issuer())
    }

    /// Set the display name
    pub fn for_user(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Drop the `name` claim
    pub fn without_name(mut self) -> Self {
        self.name = None;
        self
    }

    /// Set the subject
    pub fn with_subject(mut self, sub: &str) -> Self {
        self.sub = sub.to_string();
        self
    }

    /// Set the issuer
    pub fn issued_by(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    /// Set a single audience
    pub fn for_audience(mut self, aud: &str) -> Self {
        self.aud = json!(aud);
        self
    }

    /// Set a list-valued audience
    pub fn for_audiences(mut self, aud: &[&str]) -> Self {
        self.aud = json!(aud);
        self
    }

    /// Set the scope (space-separated)
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scp = Some(scope.to_string());
        self
    }

    /// Drop the `scp` claim
    pub fn without_scope(mut self) -> Self {
        self.scp = None;
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        if let Some(name) = self.name {
            claims.insert("name".to_string(), json!(name));
        }
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("aud".to_string(), self.aud);
        if let Some(scp) = self.scp {
            claims.insert("scp".to_string(), json!(scp));
        }
        claims.insert("exp".to_string(), json!(self.exp));
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        Value::Object(claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
