//! HTTP routes for the client application.

use crate::config::Config;
use crate::handlers;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Upper bound on a single request, unless the proxy timeout needs longer.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    /// Client for proxied API calls, carrying the proxy timeout.
    pub http_client: reqwest::Client,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness check
/// - `/authConfig.js` - Templated browser configuration
/// - `/api` - Proxy to the resource server
/// - Static files, falling back to `index.html` for client-side routing
/// - TraceLayer for request logging
/// - Request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let static_files =
        ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    // The proxy must be able to answer 504 itself before the layer gives up
    let request_timeout =
        Duration::from_secs(REQUEST_TIMEOUT_SECONDS.max(state.config.proxy_timeout_seconds + 1));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/authConfig.js", get(handlers::auth_config))
        .route("/api", get(handlers::proxy_api))
        .with_state(state)
        .fallback_service(static_files)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
