//! Authenticated proxy to the resource server.
//!
//! `GET /api` forwards to `{API_URL}/api`, copying the caller's
//! `Authorization` header verbatim. Only successful upstream responses are
//! relayed; everything else becomes a single 502 or 504.

use crate::errors::AppError;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Largest upstream body the proxy will relay (1 MiB).
pub const MAX_UPSTREAM_BODY_BYTES: usize = 1024 * 1024;

/// Build the HTTP client used for upstream calls.
pub fn build_proxy_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Handler for GET /api
#[instrument(skip_all, name = "app.proxy")]
pub async fn proxy_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let endpoint = state.config.upstream_api_endpoint();

    let mut request = state.http_client.get(&endpoint);
    if let Some(authorization) = headers.get(AUTHORIZATION) {
        request = request.header(AUTHORIZATION, authorization.clone());
    }

    let upstream = request.send().await.map_err(upstream_error)?;

    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!(
            target: "app.proxy",
            upstream_status = status.as_u16(),
            "Upstream API returned an error status"
        );
        return Err(AppError::BadGateway(format!(
            "upstream returned {}",
            status
        )));
    }

    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let body = read_capped_body(upstream).await?;

    tracing::debug!(
        target: "app.proxy",
        upstream_status = status.as_u16(),
        bytes = body.len(),
        "Relaying upstream response"
    );

    let mut response = (status, body).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    Ok(response)
}

/// Buffer the upstream body, giving up once it exceeds the cap.
async fn read_capped_body(mut upstream: reqwest::Response) -> Result<Vec<u8>, AppError> {
    if upstream
        .content_length()
        .is_some_and(|len| len > MAX_UPSTREAM_BODY_BYTES as u64)
    {
        return Err(oversized_body());
    }

    let mut body = Vec::new();
    while let Some(chunk) = upstream.chunk().await.map_err(upstream_error)? {
        if body.len() + chunk.len() > MAX_UPSTREAM_BODY_BYTES {
            return Err(oversized_body());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn oversized_body() -> AppError {
    tracing::warn!(
        target: "app.proxy",
        limit = MAX_UPSTREAM_BODY_BYTES,
        "Upstream API response body too large"
    );
    AppError::BadGateway(format!(
        "upstream body exceeds {} bytes",
        MAX_UPSTREAM_BODY_BYTES
    ))
}

fn upstream_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        tracing::warn!(target: "app.proxy", error = %err, "Upstream API timed out");
        AppError::GatewayTimeout(err.to_string())
    } else if err.is_builder() {
        tracing::error!(target: "app.proxy", error = %err, "Invalid upstream request");
        AppError::Internal(err.to_string())
    } else {
        tracing::warn!(target: "app.proxy", error = %err, "Upstream API request failed");
        AppError::BadGateway(err.to_string())
    }
}
