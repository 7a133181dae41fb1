//! Void API server entry point: HTTP write path plus the background
//! notification consumer.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use void_api::config::AppConfig;
use void_api::error::AppError;
use void_api::state::AppState;
use void_api::telemetry::Telemetry;
use void_core::broker::Broker;
use void_core::clock::{Clock, SystemClock};
use void_notifications::application::backoff::ReconnectPolicy;
use void_notifications::application::consumer::{ConsumerConfig, ConsumerLoop};
use void_notifications::application::fan_out::FanOutHandler;
use void_notifications::application::publisher::ShoutPublisher;
use void_store::pg_broker::PgBroker;
use void_store::pg_notification_store::PgNotificationStore;
use void_store::pg_shout_repository::PgShoutRepository;
use void_store::schema::MIGRATOR;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = Telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting Void notification service");

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let broker: Arc<dyn Broker> = Arc::new(
        PgBroker::new(pool.clone())
            .with_poll_interval(config.queue_poll_interval)
            .with_lease(config.queue_lease),
    );
    let publisher = ShoutPublisher::new(Arc::clone(&broker));
    publisher.declare().await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notification_store = Arc::new(PgNotificationStore::new(pool.clone()));

    // Start the consumer.
    let fan_out = FanOutHandler::new(notification_store.clone(), Arc::clone(&clock))
        .with_concurrency(config.fanout_concurrency);
    let consumer = ConsumerLoop::new(
        broker,
        fan_out,
        ConsumerConfig {
            max_redeliveries: config.max_redeliveries,
        },
    );
    let consumer_task = tokio::spawn(async move {
        let err = consumer.run_forever(&ReconnectPolicy::default()).await;
        error!(error = %err, "notification consumer stopped");
    });

    // Build application state and router.
    let app_state = AppState::new(
        clock,
        Arc::new(PgShoutRepository::new(pool)),
        notification_store,
        publisher,
    );
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = void_api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    consumer_task.abort();
    telemetry.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
