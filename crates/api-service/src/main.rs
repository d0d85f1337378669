//! API service
//!
//! Resource server that validates bearer tokens against an identity
//! provider's published keys.

use api_service::auth::{JwtValidator, ValidationConfig};
use api_service::config::Config;
use api_service::observability::metrics::init_metrics_recorder;
use api_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_service=debug,common=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting API service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        identity_metadata_url = %config.identity_metadata_url(),
        validate_issuer = config.validate_issuer,
        validate_audience = config.validate_audience,
        required_scopes = ?config.required_scopes,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Discovery must succeed before the listener binds
    let jwt_validator = JwtValidator::discover(ValidationConfig::from_config(&config))
        .await
        .map_err(|e| {
            error!("Failed to resolve identity provider metadata: {}", e);
            e
        })?;

    let bind_address = config.bind_address.clone();
    let drain = config.drain;

    let state = Arc::new(AppState {
        jwt_validator: Arc::new(jwt_validator),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("API service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(common::shutdown::shutdown_signal(drain))
        .await?;

    info!("API service shutdown complete");

    Ok(())
}
