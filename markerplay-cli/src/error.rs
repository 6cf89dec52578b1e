//! CLI error type.

use std::fmt;

use markerplay::analytics::AnalyticsDeliveryError;
use markerplay::config::ConfigError;
use markerplay::marker::CatalogError;
use markerplay::session::SessionError;
use markerplay::tracking::TrackingError;

/// Errors surfaced by CLI commands. Printed once by `main`.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or missing settings.
    Config(String),

    /// The configuration file could not be read or written.
    ConfigFile(ConfigError),

    /// The marker catalog could not be read.
    Catalog(CatalogError),

    /// The scan session could not be started or failed.
    Session(SessionError),

    /// Analytics sink setup failed.
    Analytics(AnalyticsDeliveryError),

    /// Failed to create the Tokio runtime.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Catalog(e) => write!(f, "Marker catalog error: {}", e),
            CliError::Session(e) => write!(f, "Scan failed: {}", e),
            CliError::Analytics(e) => write!(f, "Analytics setup failed: {}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Catalog(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Analytics(e) => Some(e),
            CliError::Config(_) | CliError::Runtime(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}

impl From<TrackingError> for CliError {
    fn from(e: TrackingError) -> Self {
        CliError::Session(SessionError::Tracking(e))
    }
}

impl From<AnalyticsDeliveryError> for CliError {
    fn from(e: AnalyticsDeliveryError) -> Self {
        CliError::Analytics(e)
    }
}
