//! Addressable configuration keys (`section.key`) for get/set.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{parse_bool, parse_level, parse_policy, parse_u64, ConfigError, ConfigFile};

/// Every settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CatalogUrl,
    CatalogMarkersFile,
    CatalogTimeoutSecs,
    AnalyticsEnabled,
    AnalyticsUrl,
    AnalyticsTimeoutSecs,
    TrackingPolicy,
    TrackingFrameIntervalMs,
    LoggingLevel,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 10] = [
    ConfigKey::CatalogUrl,
    ConfigKey::CatalogMarkersFile,
    ConfigKey::CatalogTimeoutSecs,
    ConfigKey::AnalyticsEnabled,
    ConfigKey::AnalyticsUrl,
    ConfigKey::AnalyticsTimeoutSecs,
    ConfigKey::TrackingPolicy,
    ConfigKey::TrackingFrameIntervalMs,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Full `section.key` name.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::CatalogUrl => "catalog.url",
            ConfigKey::CatalogMarkersFile => "catalog.markers_file",
            ConfigKey::CatalogTimeoutSecs => "catalog.timeout_secs",
            ConfigKey::AnalyticsEnabled => "analytics.enabled",
            ConfigKey::AnalyticsUrl => "analytics.url",
            ConfigKey::AnalyticsTimeoutSecs => "analytics.timeout_secs",
            ConfigKey::TrackingPolicy => "tracking.policy",
            ConfigKey::TrackingFrameIntervalMs => "tracking.frame_interval_ms",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingDirectory => "logging.directory",
        }
    }

    pub fn section(self) -> &'static str {
        self.split().0
    }

    pub fn key_name(self) -> &'static str {
        self.split().1
    }

    fn split(self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or((name, ""))
    }

    /// Current value as a string; empty when unset.
    pub fn get(self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::CatalogUrl => config.catalog.url.clone().unwrap_or_default(),
            ConfigKey::CatalogMarkersFile => display_path(&config.catalog.markers_file),
            ConfigKey::CatalogTimeoutSecs => config.catalog.timeout_secs.to_string(),
            ConfigKey::AnalyticsEnabled => config.analytics.enabled.to_string(),
            ConfigKey::AnalyticsUrl => config.analytics.url.clone().unwrap_or_default(),
            ConfigKey::AnalyticsTimeoutSecs => config.analytics.timeout_secs.to_string(),
            ConfigKey::TrackingPolicy => config.tracking.policy.to_string(),
            ConfigKey::TrackingFrameIntervalMs => config.tracking.frame_interval_ms.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => display_path(&config.logging.directory),
        }
    }

    /// Validate and store `value`. An empty value clears optional keys.
    pub fn set(self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let name = self.name();
        match self {
            ConfigKey::CatalogUrl => config.catalog.url = optional(value),
            ConfigKey::CatalogMarkersFile => {
                config.catalog.markers_file = optional(value).map(PathBuf::from)
            }
            ConfigKey::CatalogTimeoutSecs => config.catalog.timeout_secs = parse_u64(name, value)?,
            ConfigKey::AnalyticsEnabled => config.analytics.enabled = parse_bool(name, value)?,
            ConfigKey::AnalyticsUrl => config.analytics.url = optional(value),
            ConfigKey::AnalyticsTimeoutSecs => {
                config.analytics.timeout_secs = parse_u64(name, value)?
            }
            ConfigKey::TrackingPolicy => config.tracking.policy = parse_policy(name, value)?,
            ConfigKey::TrackingFrameIntervalMs => {
                config.tracking.frame_interval_ms = parse_u64(name, value)?
            }
            ConfigKey::LoggingLevel => config.logging.level = parse_level(name, value)?,
            ConfigKey::LoggingDirectory => {
                config.logging.directory = optional(value).map(PathBuf::from)
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingPolicy as Policy;

    #[test]
    fn test_parse_key_names() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
        assert_eq!(
            "Tracking.Policy".parse::<ConfigKey>().unwrap(),
            ConfigKey::TrackingPolicy
        );
        assert!(matches!(
            "tracking.speed".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_section_and_key_name() {
        assert_eq!(ConfigKey::AnalyticsTimeoutSecs.section(), "analytics");
        assert_eq!(ConfigKey::AnalyticsTimeoutSecs.key_name(), "timeout_secs");
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();

        ConfigKey::TrackingPolicy
            .set(&mut config, "accept_limited")
            .unwrap();
        assert_eq!(config.tracking.policy, Policy::AcceptLimited);
        assert_eq!(ConfigKey::TrackingPolicy.get(&config), "accept_limited");

        ConfigKey::CatalogUrl
            .set(&mut config, "https://ads.example.com")
            .unwrap();
        assert_eq!(ConfigKey::CatalogUrl.get(&config), "https://ads.example.com");

        ConfigKey::CatalogUrl.set(&mut config, "  ").unwrap();
        assert!(config.catalog.url.is_none());
        assert_eq!(ConfigKey::CatalogUrl.get(&config), "");
    }

    #[test]
    fn test_set_validates() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::AnalyticsEnabled.set(&mut config, "sometimes").is_err());
        assert!(ConfigKey::CatalogTimeoutSecs.set(&mut config, "-1").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
