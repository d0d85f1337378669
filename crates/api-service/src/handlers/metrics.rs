//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated so Prometheus can scrape it. Labels are
//! bounded and never carry claim values.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # TYPE api_http_requests_total counter
/// api_http_requests_total{method="GET",endpoint="/health",status_code="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "api.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

#[cfg(test)]
mod tests {
    // A handle from an installed recorder can only exist once per process,
    // so tests build an uninstalled recorder. The route is covered in
    // tests/health_tests.rs.

    use super::*;
    use axum::body::to_bytes;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[tokio::test]
    async fn test_metrics_handler_renders_text() {
        let handle = PrometheusBuilder::new().build_recorder().handle();

        let response = metrics_handler(State(handle)).await.into_response();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(to_bytes(response.into_body(), usize::MAX).await.is_ok());
    }
}
