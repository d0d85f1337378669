//! Test server harness for E2E testing
//!
//! Provides `TestApiServer` for spawning real API server instances in tests.

use crate::identity_provider::{MockIdentityProvider, TEST_CLIENT_ID, TEST_TENANT_ID};
use api_service::auth::{JwtValidator, ValidationConfig};
use api_service::config::Config;
use api_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the API server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<(), anyhow::Error> {
///     let idp = MockIdentityProvider::start(&[]).await;
///     let server = TestApiServer::spawn(&idp).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestApiServer {
    addr: SocketAddr,
    config: Config,
    jwt_validator: Arc<JwtValidator>,
    _handle: JoinHandle<()>,
}

impl TestApiServer {
    /// Spawn a server trusting `idp` with default settings.
    pub async fn spawn(idp: &MockIdentityProvider) -> Result<Self, anyhow::Error> {
        Self::spawn_with(idp, &[]).await
    }

    /// Spawn a server trusting `idp`, with extra environment overrides.
    ///
    /// The server will:
    /// - Resolve the provider's discovery document
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        idp: &MockIdentityProvider,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("IDP_AUTHORITY".to_string(), idp.authority()),
            ("TENANT_ID".to_string(), TEST_TENANT_ID.to_string()),
            ("CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwt_validator = Arc::new(
            JwtValidator::discover(ValidationConfig::from_config(&config))
                .await
                .map_err(|e| anyhow::anyhow!("Failed to resolve discovery document: {}", e))?,
        );

        let state = Arc::new(AppState {
            jwt_validator: Arc::clone(&jwt_validator),
        });

        // Uninstalled recorder: each test server gets its own handle
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            jwt_validator,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The validator the server authenticates with.
    pub fn jwt_validator(&self) -> &Arc<JwtValidator> {
        &self.jwt_validator
    }
}

impl Drop for TestApiServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
