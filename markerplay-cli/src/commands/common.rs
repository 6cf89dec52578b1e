//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use markerplay::analytics::{AnalyticsSink, HttpAnalyticsSink, TracingAnalyticsSink};
use markerplay::config::ConfigFile;
use markerplay::marker::{FileMarkerCatalog, HttpMarkerCatalog, MarkerCatalog};
use markerplay::tracking::TrackingPolicy;

use crate::error::CliError;

/// Tracking policy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PolicyArg {
    /// Only confidently tracked images count
    Strict,
    /// Limited tracking also counts
    AcceptLimited,
}

impl From<PolicyArg> for TrackingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => TrackingPolicy::Strict,
            PolicyArg::AcceptLimited => TrackingPolicy::AcceptLimited,
        }
    }
}

/// Catalog selection flags shared by `markers` and `scan`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CatalogArgs {
    /// Marker catalog service base URL
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// Local JSON marker catalog (overrides any URL)
    #[arg(long)]
    pub markers_file: Option<PathBuf>,
}

/// Where the marker catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Url(String),
}

/// Pick the catalog source from CLI args and config.
///
/// Any CLI flag beats the config file; within one layer a local file wins
/// over a URL.
pub fn catalog_source(args: &CatalogArgs, config: &ConfigFile) -> Result<CatalogSource, CliError> {
    if let Some(path) = &args.markers_file {
        return Ok(CatalogSource::File(path.clone()));
    }
    if let Some(url) = &args.catalog_url {
        return Ok(CatalogSource::Url(url.clone()));
    }
    if let Some(path) = &config.catalog.markers_file {
        return Ok(CatalogSource::File(path.clone()));
    }
    if let Some(url) = &config.catalog.url {
        return Ok(CatalogSource::Url(url.clone()));
    }

    Err(CliError::Config(
        "No marker catalog configured. \
         Set catalog.url or catalog.markers_file, or use --catalog-url / --markers-file."
            .to_string(),
    ))
}

/// Resolve the marker catalog from CLI args and config.
pub fn resolve_catalog(
    args: &CatalogArgs,
    config: &ConfigFile,
) -> Result<Arc<dyn MarkerCatalog>, CliError> {
    match catalog_source(args, config)? {
        CatalogSource::File(path) => Ok(Arc::new(FileMarkerCatalog::new(path))),
        CatalogSource::Url(url) => Ok(Arc::new(HttpMarkerCatalog::with_timeout(
            url,
            config.catalog.timeout_secs,
        )?)),
    }
}

/// Resolve the analytics sink. Events are only logged when analytics is
/// disabled or no URL is known.
pub fn resolve_analytics(
    cli_url: Option<String>,
    disabled: bool,
    config: &ConfigFile,
) -> Result<Arc<dyn AnalyticsSink>, CliError> {
    if disabled || !config.analytics.enabled {
        return Ok(Arc::new(TracingAnalyticsSink));
    }

    match cli_url.or_else(|| config.analytics.url.clone()) {
        Some(url) => Ok(Arc::new(HttpAnalyticsSink::with_timeout(
            &url,
            config.analytics.timeout_secs,
        )?)),
        None => Ok(Arc::new(TracingAnalyticsSink)),
    }
}

/// Build the multi-threaded runtime used by async commands.
pub fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_catalog_is_config_error() {
        let result = resolve_catalog(&CatalogArgs::default(), &ConfigFile::default());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_markers_file_wins() {
        let mut config = ConfigFile::default();
        config.catalog.url = Some("https://ads.example.com".to_string());
        let args = CatalogArgs {
            catalog_url: None,
            markers_file: Some(PathBuf::from("catalog.json")),
        };
        assert_eq!(
            catalog_source(&args, &config).unwrap(),
            CatalogSource::File(PathBuf::from("catalog.json"))
        );
    }

    #[test]
    fn test_cli_url_overrides_config_file() {
        let mut config = ConfigFile::default();
        config.catalog.markers_file = Some(PathBuf::from("/nonexistent/catalog.json"));
        let args = CatalogArgs {
            catalog_url: Some("https://cli.example.com".to_string()),
            markers_file: None,
        };

        assert_eq!(
            catalog_source(&args, &config).unwrap(),
            CatalogSource::Url("https://cli.example.com".to_string())
        );
        assert!(resolve_catalog(&args, &config).is_ok());
    }

    #[test]
    fn test_config_file_beats_config_url() {
        let mut config = ConfigFile::default();
        config.catalog.url = Some("https://ads.example.com".to_string());
        config.catalog.markers_file = Some(PathBuf::from("catalog.json"));

        assert_eq!(
            catalog_source(&CatalogArgs::default(), &config).unwrap(),
            CatalogSource::File(PathBuf::from("catalog.json"))
        );
    }

    #[test]
    fn test_policy_arg_conversion() {
        assert_eq!(
            TrackingPolicy::from(PolicyArg::AcceptLimited),
            TrackingPolicy::AcceptLimited
        );
    }
}
