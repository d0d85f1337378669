//! Graceful shutdown signal handling.
//!
//! Both services pass [`shutdown_signal`] to `axum::serve(..).with_graceful_shutdown`.

use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Listens for shutdown signals (SIGTERM, SIGINT).
///
/// Returns when a shutdown signal is received and the drain period is complete.
pub async fn shutdown_signal(drain: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    if drain.is_zero() {
        info!("Skipping drain period");
    } else {
        warn!("Draining connections for {} seconds...", drain.as_secs());
        tokio::time::sleep(drain).await;
        info!("Drain period complete");
    }
}

/// Parse the `DRAIN_SECONDS` value shared by both services.
///
/// Missing or unparsable values mean no drain period.
#[must_use]
pub fn drain_period(value: Option<&str>) -> Duration {
    Duration::from_secs(value.and_then(|s| s.parse().ok()).unwrap_or(0))
}
