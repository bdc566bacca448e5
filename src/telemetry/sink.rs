//! telemetry::sink
//!
//! Destinations for telemetry events.
//!
//! # Design
//!
//! The `TelemetrySink` trait is async because emission is network I/O. The
//! coordinator never propagates a sink error; implementations only need to
//! report what went wrong so it can be logged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use thiserror::Error;

use super::TelemetryEvent;

/// Default analytics collector.
pub const DEFAULT_ANALYTICS_URL: &str = "https://analytics.parseable.io:80/pb";

/// Environment variable overriding the collector endpoint.
pub const ANALYTICS_URL_ENV: &str = "PB_ANALYTICS_URL";

/// Upper bound on a single emission.
const EMIT_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT_VALUE: &str = concat!("pb/", env!("CARGO_PKG_VERSION"));

/// Errors from emitting a telemetry event.
#[derive(Debug, Clone, Error)]
pub enum TelemetryError {
    /// Building the HTTP client failed.
    #[error("failed to build telemetry client: {0}")]
    Client(String),

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The collector answered with a non-success status.
    #[error("collector rejected event with status {0}")]
    Rejected(u16),
}

/// A destination for telemetry events.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Deliver one event.
    async fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Posts events as JSON to an HTTP collector.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: Client,
    endpoint: String,
}

impl HttpTelemetrySink {
    /// Create a sink posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TelemetryError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(EMIT_TIMEOUT)
            .build()
            .map_err(|e| TelemetryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a sink for `$PB_ANALYTICS_URL` or the default collector.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let endpoint = std::env::var(ANALYTICS_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ANALYTICS_URL.to_string());
        Self::new(endpoint)
    }

    /// The collector endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .map_err(|e| TelemetryError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TelemetryError::Rejected(status.as_u16()))
        }
    }
}

/// Drops every event.
///
/// Used when the HTTP sink cannot be constructed so the lifecycle stays
/// uniform.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl TelemetrySink for DiscardSink {
    async fn emit(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}
