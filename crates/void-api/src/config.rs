//! Process configuration read from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `DATABASE_URL` (required).
    pub database_url: String,
    /// `HOST`, default `0.0.0.0`.
    pub host: String,
    /// `PORT`, default `3000`.
    pub port: u16,
    /// `DATABASE_MAX_CONNECTIONS`, default `10`.
    pub database_max_connections: u32,
    /// `QUEUE_POLL_INTERVAL_MS`, default `500`.
    pub queue_poll_interval: Duration,
    /// `QUEUE_LEASE_SECS`, default `30`.
    pub queue_lease: Duration,
    /// `FANOUT_CONCURRENCY`, default `1`.
    pub fanout_concurrency: usize,
    /// `CONSUMER_MAX_REDELIVERIES`, unset by default.
    pub max_redeliveries: Option<u32>,
    /// `OTEL_EXPORTER_OTLP_ENDPOINT`, unset by default.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            queue_poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "QUEUE_POLL_INTERVAL_MS",
                500,
            )?),
            queue_lease: Duration::from_secs(parse_or(&lookup, "QUEUE_LEASE_SECS", 30)?),
            fanout_concurrency: parse_or(&lookup, "FANOUT_CONCURRENCY", 1)?,
            max_redeliveries: parse_optional(&lookup, "CONSUMER_MAX_REDELIVERIES")?,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }

    /// The address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<T>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.parse()
                .map_err(|e| AppError::Config(format!("{key} is invalid: {e}")))
        })
        .transpose()
}
