//! Client application
//!
//! Static single-page app host with an authenticated API proxy.

use app_service::config::Config;
use app_service::handlers::proxy::build_proxy_client;
use app_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_service=debug,common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting client application");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        app_url = %config.app_url,
        api_url = %config.api_url,
        static_dir = %config.static_dir.display(),
        proxy_timeout_seconds = config.proxy_timeout_seconds,
        "Configuration loaded successfully"
    );

    if !config.static_dir.is_dir() {
        warn!(
            static_dir = %config.static_dir.display(),
            "Static directory does not exist; only /health and /api will succeed"
        );
    }

    let http_client = build_proxy_client(config.proxy_timeout()).map_err(|e| {
        error!("Failed to build HTTP client: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();
    let drain = config.drain;

    let state = Arc::new(AppState {
        config,
        http_client,
    });

    let app = routes::build_routes(state);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Client application listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(common::shutdown::shutdown_signal(drain))
        .await?;

    info!("Client application shutdown complete");

    Ok(())
}
