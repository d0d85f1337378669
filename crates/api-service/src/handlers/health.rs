//! Health check handler.

use axum::Json;
use serde::Serialize;
use tracing::instrument;

/// Liveness response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub health: &'static str,
}

/// Handler for GET /health
///
/// Always returns 200 `{"health":"ok"}`; the endpoint does not depend on the
/// identity provider or on authentication.
#[instrument(skip_all, name = "api.health.check")]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { health: "ok" })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_body() {
        let Json(response) = health_check().await;

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json, serde_json::json!({ "health": "ok" }));
    }
}
