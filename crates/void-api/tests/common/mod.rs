//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use void_core::broker::Broker;
use void_core::clock::Clock;
use void_notifications::application::consumer::{ConsumerConfig, ConsumerLoop};
use void_notifications::application::fan_out::FanOutHandler;
use void_notifications::application::publisher::ShoutPublisher;
use void_store::pg_broker::PgBroker;
use void_store::pg_notification_store::PgNotificationStore;
use void_store::pg_shout_repository::PgShoutRepository;
use void_test_support::FixedClock;

use void_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::reference())
}

/// A `PgBroker` that polls fast enough for tests.
pub fn test_broker(pool: PgPool) -> Arc<dyn Broker> {
    Arc::new(PgBroker::new(pool).with_poll_interval(Duration::from_millis(10)))
}

/// Build the full app router over real PostgreSQL adapters and a fixed
/// clock. Declares the notification queue first.
pub async fn build_test_app(pool: PgPool) -> Router {
    let publisher = ShoutPublisher::new(test_broker(pool.clone()));
    publisher.declare().await.unwrap();
    let app_state = AppState::new(
        fixed_clock(),
        Arc::new(PgShoutRepository::new(pool.clone())),
        Arc::new(PgNotificationStore::new(pool)),
        publisher,
    );
    void_api::build_router(app_state)
}

/// A consumer wired the way the binary wires it.
pub fn build_consumer(pool: PgPool) -> ConsumerLoop {
    let fan_out = FanOutHandler::new(Arc::new(PgNotificationStore::new(pool.clone())), fixed_clock());
    ConsumerLoop::new(test_broker(pool), fan_out, ConsumerConfig::default())
}

/// Insert a registered user and return its id.
pub async fn insert_user(pool: &PgPool, username: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("INSERT INTO users (username) VALUES ($1) RETURNING id")
        .bind(username)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}
