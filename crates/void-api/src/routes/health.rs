//! Liveness endpoint.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use void_core::broker::SHOUT_NOTIFICATIONS_QUEUE;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    /// Queue the consumer drains.
    pub queue: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: env!("CARGO_PKG_NAME"),
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        queue: SHOUT_NOTIFICATIONS_QUEUE,
    })
}

/// Returns the liveness router. Needs no state.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}
