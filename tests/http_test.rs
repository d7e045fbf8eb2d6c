//! HTTP health endpoint tests.
//!
//! Requests are driven through the router with `tower::ServiceExt::oneshot`,
//! no socket involved.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use cache_shell::backend::InMemoryConnector;
use cache_shell::http::{router, AppState};
use cache_shell::{ConnectionRegistry, KeyValueStore, ReconnectPolicy, RegistryConfig};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app(config: RegistryConfig) -> (InMemoryConnector, Router) {
    let connector = InMemoryConnector::new();
    let registry = Arc::new(ConnectionRegistry::new(connector.clone(), config));
    let state = AppState {
        app_name: "sample-app".to_string(),
        store: KeyValueStore::new(registry),
    };
    (connector, router(state))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("Invalid request"),
        )
        .await
        .expect("Router is infallible");

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    (status, body.to_vec())
}

#[tokio::test]
async fn test_liveness_is_working() {
    let (_, app) = app(RegistryConfig::default());

    let (status, body) = get(app, "/liveness").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"working");
}

#[tokio::test]
async fn test_liveness_does_not_touch_backend() {
    let (connector, app) = app(RegistryConfig::default());
    connector.refuse_connections(u32::MAX);

    let (status, _) = get(app, "/liveness").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(connector.connect_attempts(), 0);
}

#[tokio::test]
async fn test_readiness_with_reachable_backend() {
    let (connector, app) = app(RegistryConfig::default());

    let (status, body) = get(app, "/readiness").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ready");
    assert_eq!(connector.open_connections(), 1);
}

#[tokio::test]
async fn test_readiness_with_unreachable_backend() {
    let config = RegistryConfig::default()
        .with_policy(ReconnectPolicy::default().with_max_attempts(Some(1)));
    let (connector, app) = app(config);
    connector.refuse_connections(u32::MAX);

    let (status, body) = get(app, "/readiness").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).expect("Error body should be JSON");
    let message = body["error"].as_str().expect("Error message missing");
    assert!(message.contains("refused"), "unexpected message: {}", message);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (_, app) = app(RegistryConfig::default());

    let (status, _) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
