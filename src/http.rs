//! # Health Check Handlers
//!
//! - `GET /liveness`: the process is up and serving requests
//! - `GET /readiness`: the primary backend answers `PING`
//!
//! Failures are answered with a JSON body `{"error": "..."}`.

use crate::backend::Connector;
use crate::error::Error;
use crate::registry::Role;
use crate::store::KeyValueStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// Shared handler state.
pub struct AppState<C: Connector> {
    pub app_name: String,
    pub store: KeyValueStore<C>,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        AppState {
            app_name: self.app_name.clone(),
            store: self.store.clone(),
        }
    }
}

/// Error answered to an HTTP caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Unexpected failure while serving a check.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        if e.is_connection_error() {
            ApiError::unavailable(e.to_string())
        } else {
            ApiError::bad_request(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the router.
pub fn router<C: Connector + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/liveness", get(liveness))
        .route("/readiness", get(readiness::<C>))
        .with_state(state)
}

/// Liveness probe: GET /liveness
pub async fn liveness() -> Result<(StatusCode, &'static str), ApiError> {
    Ok((StatusCode::OK, "working"))
}

/// Readiness probe: GET /readiness
///
/// Ready once the primary connection can be acquired and answers `PING`.
pub async fn readiness<C: Connector + 'static>(
    State(state): State<AppState<C>>,
) -> Result<(StatusCode, &'static str), ApiError> {
    debug!("Performing readiness probe for {}", state.app_name);

    match state.store.ping(Role::Primary).await {
        Ok(true) => Ok((StatusCode::OK, "ready")),
        Ok(false) => {
            warn!("⚠ {} is not ready: backend did not answer PING", state.app_name);
            Err(ApiError::unavailable("backend did not answer PING"))
        }
        Err(e) => {
            warn!("⚠ {} is not ready: {}", state.app_name, e);
            Err(ApiError::unavailable(e.to_string()))
        }
    }
}
