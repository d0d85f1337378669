//! Mock OpenID Connect identity provider
//!
//! Serves a discovery document and a JWKS document from a wiremock server,
//! laid out the way a multi-tenant provider does:
//!
//! ```text
//! {uri}/{tenant}/v2.0/.well-known/openid-configuration
//! {uri}/{tenant}/discovery/v2.0/keys
//! ```

use crate::crypto_fixtures::TestKeypair;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tenant served by the mock provider.
pub const TEST_TENANT_ID: &str = "test-tenant";

/// Client ID the test API server is registered as (and its default audience).
pub const TEST_CLIENT_ID: &str = "test-api-client-id";

/// Wiremock-backed identity provider for E2E tests.
pub struct MockIdentityProvider {
    server: MockServer,
}

impl MockIdentityProvider {
    /// Start a provider publishing `keys`.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        Self::start_with_jwks_delay(keys, Duration::ZERO).await
    }

    /// Start a provider whose JWKS responses are delayed by `delay`.
    pub async fn start_with_jwks_delay(keys: &[&TestKeypair], delay: Duration) -> Self {
        let idp = Self {
            server: MockServer::start().await,
        };
        idp.mount_discovery().await;

        let jwks = json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() });
        Mock::given(method("GET"))
            .and(path(idp.jwks_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks).set_delay(delay))
            .mount(&idp.server)
            .await;

        idp
    }

    /// Start a provider whose JWKS endpoint answers with `status`.
    pub async fn start_with_jwks_status(status: u16) -> Self {
        let idp = Self {
            server: MockServer::start().await,
        };
        idp.mount_discovery().await;

        Mock::given(method("GET"))
            .and(path(idp.jwks_path()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&idp.server)
            .await;

        idp
    }

    async fn mount_discovery(&self) {
        Mock::given(method("GET"))
            .and(path(self.discovery_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": self.issuer(),
                "jwks_uri": self.jwks_uri(),
                "authorization_endpoint": format!("{}/{}/oauth2/v2.0/authorize", self.authority(), TEST_TENANT_ID),
                "token_endpoint": format!("{}/{}/oauth2/v2.0/token", self.authority(), TEST_TENANT_ID),
                "id_token_signing_alg_values_supported": ["RS256"],
            })))
            .mount(&self.server)
            .await;
    }

    fn discovery_path(&self) -> String {
        format!("/{}/v2.0/.well-known/openid-configuration", TEST_TENANT_ID)
    }

    fn jwks_path(&self) -> String {
        format!("/{}/discovery/v2.0/keys", TEST_TENANT_ID)
    }

    /// Authority to configure as `IDP_AUTHORITY` (includes the http scheme).
    pub fn authority(&self) -> String {
        self.server.uri()
    }

    /// Issuer the provider advertises and signs tokens as.
    pub fn issuer(&self) -> String {
        format!("{}/{}/v2.0", self.authority(), TEST_TENANT_ID)
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}{}", self.authority(), self.jwks_path())
    }

    /// Number of JWKS requests the provider has received.
    pub async fn jwks_requests(&self) -> usize {
        let jwks_path = self.jwks_path();
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == jwks_path)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_discovery_and_jwks() {
        let key = TestKeypair::ed25519(1, "ed-key").unwrap();
        let idp = MockIdentityProvider::start(&[&key]).await;

        let discovery: serde_json::Value = reqwest::get(format!(
            "{}/.well-known/openid-configuration",
            idp.issuer()
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(discovery["issuer"], idp.issuer());
        assert_eq!(discovery["jwks_uri"], idp.jwks_uri());

        let jwks: serde_json::Value = reqwest::get(idp.jwks_uri())
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(jwks["keys"][0]["kid"], "ed-key");
        assert_eq!(idp.jwks_requests().await, 1);
    }
}
