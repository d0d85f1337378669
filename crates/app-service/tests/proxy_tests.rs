//! Proxy integration tests.
//!
//! Drives `GET /api` through the full router against a wiremock upstream.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use app_service::config::Config;
use app_service::handlers::proxy::{build_proxy_client, MAX_UPSTREAM_BODY_BYTES};
use app_service::routes::{build_routes, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router_for(api_url: &str, overrides: &[(&str, &str)]) -> Result<axum::Router> {
    let mut vars = HashMap::from([
        ("API_URL".to_string(), api_url.to_string()),
        (
            "STATIC_DIR".to_string(),
            concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string(),
        ),
    ]);
    for (name, value) in overrides {
        vars.insert((*name).to_string(), (*value).to_string());
    }

    let config = Config::from_vars(&vars)?;
    let http_client = build_proxy_client(config.proxy_timeout())?;

    Ok(build_routes(Arc::new(AppState {
        config,
        http_client,
    })))
}

async fn get_api(router: axum::Router, authorization: Option<&str>) -> Result<Response> {
    let mut request = Request::get("/api");
    if let Some(value) = authorization {
        request = request.header("authorization", value);
    }
    Ok(router.oneshot(request.body(Body::empty())?).await?)
}

async fn body_json(response: Response) -> Result<serde_json::Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

/// Test that a successful upstream response is relayed with its content type.
#[tokio::test]
async fn test_proxy_relays_success() -> Result<()> {
    let upstream = MockServer::start().await;
    let claims = json!({
        "name": "Megan Bowen",
        "issued-by": "https://login.microsoftonline.com/tenant/v2.0",
        "issued-for": "client",
        "scope": "access_as_user",
    });
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(header("authorization", "Bearer abc.def.ghi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claims.clone()))
        .expect(1)
        .mount(&upstream)
        .await;

    let response = get_api(router_for(&upstream.uri(), &[])?, Some("Bearer abc.def.ghi")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("application/json"));
    assert_eq!(body_json(response).await?, claims);

    Ok(())
}

/// Test that no Authorization header is invented when the caller sent none.
#[tokio::test]
async fn test_proxy_omits_missing_authorization() -> Result<()> {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&upstream)
        .await;

    let response = get_api(router_for(&upstream.uri(), &[])?, None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests.first().unwrap().headers.get("authorization").is_none());

    Ok(())
}

/// Test that upstream rejections become a single 502.
#[tokio::test]
async fn test_proxy_maps_upstream_errors_to_502() -> Result<()> {
    for status in [401, 404, 500, 503] {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": "INVALID_TOKEN", "message": "upstream detail" }
            })))
            .mount(&upstream)
            .await;

        let response = get_api(router_for(&upstream.uri(), &[])?, Some("Bearer x")).await?;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "upstream {}", status);
        let body = body_json(response).await?;
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");
        assert!(!body.to_string().contains("upstream detail"));
    }

    Ok(())
}

/// Test that an oversized upstream body is not relayed.
#[tokio::test]
async fn test_proxy_oversized_body_is_502() -> Result<()> {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("x".repeat(MAX_UPSTREAM_BODY_BYTES + 1)),
        )
        .mount(&upstream)
        .await;

    let response = get_api(router_for(&upstream.uri(), &[])?, Some("Bearer x")).await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await?["error"]["code"], "BAD_GATEWAY");

    Ok(())
}

/// Test that a body exactly at the cap is still relayed.
#[tokio::test]
async fn test_proxy_relays_body_at_limit() -> Result<()> {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("x".repeat(MAX_UPSTREAM_BODY_BYTES)),
        )
        .mount(&upstream)
        .await;

    let response = get_api(router_for(&upstream.uri(), &[])?, Some("Bearer x")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    assert_eq!(bytes.len(), MAX_UPSTREAM_BODY_BYTES);

    Ok(())
}

/// Test that an unreachable upstream becomes a 502.
#[tokio::test]
async fn test_proxy_connection_failure_is_502() -> Result<()> {
    let response = get_api(router_for("http://127.0.0.1:9", &[])?, Some("Bearer x")).await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await?["error"]["code"], "BAD_GATEWAY");

    Ok(())
}

/// Test that a slow upstream becomes a 504 after the proxy timeout.
#[tokio::test]
async fn test_proxy_timeout_is_504() -> Result<()> {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_millis(2500)),
        )
        .mount(&upstream)
        .await;

    let router = router_for(&upstream.uri(), &[("PROXY_TIMEOUT_SECONDS", "1")])?;
    let response = get_api(router, Some("Bearer x")).await?;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_json(response).await?["error"]["code"], "GATEWAY_TIMEOUT");

    Ok(())
}
