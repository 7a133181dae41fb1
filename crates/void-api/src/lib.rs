//! Void — HTTP surface and process wiring for the shout notification
//! pipeline.

use axum::Router;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

/// Builds the application router over `state`. Shared by the binary and the
/// integration tests.
pub fn build_router(state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router::<state::AppState>())
        .nest("/api/v1/shouts", routes::shouts::router())
        .nest("/api/v1/users", routes::notifications::router())
        .with_state(state)
}
