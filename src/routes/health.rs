// src/routes/health.rs
//! Liveness endpoint for the forecast service.
//!
//! Exports a subrouter containing `GET /health` to the gateway (`mod.rs`),
//! following the Explicit Module Boundary Pattern (EMBP). The check never
//! fits a model, so it stays cheap under load.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges cleanly with the gateway
/// router regardless of the state type.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
