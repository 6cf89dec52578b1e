//! Configuration file handling.
//!
//! Settings live in `config.ini` under the platform config directory
//! (`~/.config/markerplay/config.ini` on Linux). CLI flags take precedence
//! over file values.

mod file;
mod keys;

use std::path::PathBuf;

pub use file::{
    AnalyticsSettings, CatalogSettings, ConfigError, ConfigFile, LoggingSettings,
    TrackingSettings, DEFAULT_LOG_LEVEL,
};
pub use keys::ConfigKey;

/// Directory holding markerplay's configuration.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("markerplay")
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
