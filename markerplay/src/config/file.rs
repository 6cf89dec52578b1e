//! INI configuration file.
//!
//! ```ini
//! [catalog]
//! url = https://ads.example.com
//! markers_file =
//! timeout_secs = 30
//!
//! [analytics]
//! enabled = true
//! url = https://ads.example.com
//! timeout_secs = 10
//!
//! [tracking]
//! policy = strict
//! frame_interval_ms = 16
//!
//! [logging]
//! level = info
//! directory =
//! ```
//!
//! Missing keys take their defaults; a missing file is the default config.
//! Relative paths are relative to the config file's directory once the
//! caller applies [`ConfigFile::resolve_relative_to`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::analytics::DEFAULT_ANALYTICS_TIMEOUT_SECS;
use crate::marker::DEFAULT_CATALOG_TIMEOUT_SECS;
use crate::tracking::{TrackingPolicy, DEFAULT_FRAME_INTERVAL_MS};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Base URL of the marker catalog service.
    pub url: Option<String>,
    /// Local JSON catalog, used instead of `url` when set.
    pub markers_file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: None,
            markers_file: None,
            timeout_secs: DEFAULT_CATALOG_TIMEOUT_SECS,
        }
    }
}

/// `[analytics]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsSettings {
    pub enabled: bool,
    /// Analytics service base URL. Events are only logged when unset.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            timeout_secs: DEFAULT_ANALYTICS_TIMEOUT_SECS,
        }
    }
}

/// `[tracking]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSettings {
    pub policy: TrackingPolicy,
    /// Frame period of the scripted provider.
    pub frame_interval_ms: u64,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            policy: TrackingPolicy::default(),
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    /// Directory for daily log files. Stderr only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub catalog: CatalogSettings,
    pub analytics: AnalyticsSettings,
    pub tracking: TrackingSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&super::config_file_path())
    }

    /// Load from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&content)
    }

    /// Anchor relative `catalog.markers_file` and `logging.directory` paths
    /// at `base`, normally the directory holding the config file.
    ///
    /// Not applied by [`ConfigFile::load_from`], so a load-and-save keeps the
    /// file's paths as written.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.catalog.markers_file,
            &mut self.logging.directory,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Parse INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("catalog")) {
            config.catalog.url = non_empty(section.get("url"));
            config.catalog.markers_file = non_empty(section.get("markers_file")).map(PathBuf::from);
            if let Some(v) = section.get("timeout_secs") {
                config.catalog.timeout_secs = parse_u64("catalog.timeout_secs", v)?;
            }
        }

        if let Some(section) = ini.section(Some("analytics")) {
            if let Some(v) = section.get("enabled") {
                config.analytics.enabled = parse_bool("analytics.enabled", v)?;
            }
            config.analytics.url = non_empty(section.get("url"));
            if let Some(v) = section.get("timeout_secs") {
                config.analytics.timeout_secs = parse_u64("analytics.timeout_secs", v)?;
            }
        }

        if let Some(section) = ini.section(Some("tracking")) {
            if let Some(v) = section.get("policy") {
                config.tracking.policy = parse_policy("tracking.policy", v)?;
            }
            if let Some(v) = section.get("frame_interval_ms") {
                config.tracking.frame_interval_ms = parse_u64("tracking.frame_interval_ms", v)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("level") {
                config.logging.level = parse_level("logging.level", v)?;
            }
            config.logging.directory = non_empty(section.get("directory")).map(PathBuf::from);
        }

        Ok(config)
    }

    /// Render as an INI document.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("catalog"))
            .set("url", self.catalog.url.clone().unwrap_or_default())
            .set("markers_file", path_string(&self.catalog.markers_file))
            .set("timeout_secs", self.catalog.timeout_secs.to_string());

        ini.with_section(Some("analytics"))
            .set("enabled", self.analytics.enabled.to_string())
            .set("url", self.analytics.url.clone().unwrap_or_default())
            .set("timeout_secs", self.analytics.timeout_secs.to_string());

        ini.with_section(Some("tracking"))
            .set("policy", self.tracking.policy.as_str())
            .set("frame_interval_ms", self.tracking.frame_interval_ms.to_string());

        ini.with_section(Some("logging"))
            .set("level", self.logging.level.clone())
            .set("directory", path_string(&self.logging.directory));

        ini
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&super::config_file_path())
    }

    /// Save to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn path_string(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "expected a non-negative integer"))
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected true or false")),
    }
}

pub(crate) fn parse_policy(key: &str, value: &str) -> Result<TrackingPolicy, ConfigError> {
    TrackingPolicy::from_str(value.trim()).map_err(|reason| ConfigError::invalid(key, value, reason))
}

pub(crate) fn parse_level(key: &str, value: &str) -> Result<String, ConfigError> {
    let level = value.trim().to_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        Err(ConfigError::invalid(
            key,
            value,
            format!("expected one of {}", LOG_LEVELS.join(", ")),
        ))
    }
}
