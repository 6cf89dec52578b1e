//! Analytics sinks.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use super::event::AnalyticsEvent;

/// Default request timeout for analytics delivery.
pub const DEFAULT_ANALYTICS_TIMEOUT_SECS: u64 = 10;

/// Failure to deliver one analytics event. Logged and dropped.
#[derive(Debug, Error)]
pub enum AnalyticsDeliveryError {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The analytics service rejected the event.
    #[error("Analytics service answered HTTP {0}")]
    Status(u16),

    /// The event could not be encoded.
    #[error("Failed to encode event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The dispatcher is no longer running.
    #[error("Analytics dispatcher is closed")]
    Closed,
}

/// Destination for analytics events.
pub trait AnalyticsSink: Send + Sync + 'static {
    /// Record one event. Called by the dispatcher only, one event at a time.
    fn record<'a>(
        &'a self,
        event: &'a AnalyticsEvent,
    ) -> BoxFuture<'a, Result<(), AnalyticsDeliveryError>>;
}

/// Sink posting events to the analytics service's `/api/analytics` endpoint.
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    /// Create a sink for the service at `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, AnalyticsDeliveryError> {
        Self::with_timeout(base_url, DEFAULT_ANALYTICS_TIMEOUT_SECS)
    }

    /// Create a sink with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self, AnalyticsDeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                AnalyticsDeliveryError::Http(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/analytics", base_url.trim_end_matches('/')),
        })
    }

    /// Full URL events are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AnalyticsSink for HttpAnalyticsSink {
    fn record<'a>(
        &'a self,
        event: &'a AnalyticsEvent,
    ) -> BoxFuture<'a, Result<(), AnalyticsDeliveryError>> {
        Box::pin(async move {
            let body = serde_json::to_vec(event)?;
            let response = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| AnalyticsDeliveryError::Http(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AnalyticsDeliveryError::Status(response.status().as_u16()));
            }
            Ok(())
        })
    }
}

/// Sink that only logs events. Used when no analytics service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalyticsSink;

impl AnalyticsSink for TracingAnalyticsSink {
    fn record<'a>(
        &'a self,
        event: &'a AnalyticsEvent,
    ) -> BoxFuture<'a, Result<(), AnalyticsDeliveryError>> {
        tracing::info!(
            marker_id = %event.marker_id,
            event_type = %event.event_type,
            session_id = %event.session_id,
            "Analytics event"
        );
        Box::pin(async { Ok(()) })
    }
}
