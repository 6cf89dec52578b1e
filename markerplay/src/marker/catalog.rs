//! Marker catalog abstraction.
//!
//! The catalog service owns marker records; the core only reads them at
//! session setup. Two clients are provided: [`HttpMarkerCatalog`] talks to
//! the catalog service's `/api/markers` endpoint, [`FileMarkerCatalog`] reads
//! a JSON export from disk (images resolved relative to the file).

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use super::model::{MarkerDescriptor, MarkerRecord, MediaRef};

/// Default request timeout for catalog HTTP calls.
pub const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 30;

/// Errors raised while reading the marker catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The catalog answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The catalog payload is not a list of marker records.
    #[error("Failed to parse marker catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Local file access failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record is missing a required field.
    #[error("Invalid marker record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Read access to the marker catalog.
pub trait MarkerCatalog: Send + Sync {
    /// List all markers in the catalog.
    fn list_markers(&self) -> BoxFuture<'_, Result<Vec<MarkerDescriptor>, CatalogError>>;

    /// Fetch the raw bytes of a marker's reference image.
    fn fetch_image<'a>(&'a self, image: &'a MediaRef) -> BoxFuture<'a, Result<Vec<u8>, CatalogError>>;
}

/// Parse a catalog payload (a JSON array of marker records).
///
/// Records without an id or image reference are rejected; duplicate ids are
/// left for slot assignment to report.
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<MarkerDescriptor>, CatalogError> {
    let records: Vec<MarkerRecord> = serde_json::from_slice(bytes)?;

    for (index, record) in records.iter().enumerate() {
        let missing = if record.id.trim().is_empty() {
            Some("empty id")
        } else if record.marker_image_url.trim().is_empty() {
            Some("empty marker_image_url")
        } else {
            None
        };
        if let Some(reason) = missing {
            return Err(CatalogError::InvalidRecord {
                index,
                reason: reason.to_string(),
            });
        }
    }

    Ok(records.into_iter().map(MarkerDescriptor::from).collect())
}

// =============================================================================
// HTTP catalog
// =============================================================================

/// Catalog client for the marker service's HTTP API.
pub struct HttpMarkerCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarkerCatalog {
    /// Create a client for the catalog at `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        Self::with_timeout(base_url, DEFAULT_CATALOG_TIMEOUT_SECS)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the marker listing endpoint.
    pub fn markers_url(&self) -> String {
        format!("{}/api/markers", self.base_url)
    }

    /// Resolve a media reference against the catalog base URL.
    fn resolve(&self, media: &MediaRef) -> String {
        if media.is_url() {
            media.as_str().to_string()
        } else {
            format!("{}/{}", self.base_url, media.as_str().trim_start_matches('/'))
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| CatalogError::Http(format!("Failed to read response: {}", e)))
    }
}

impl MarkerCatalog for HttpMarkerCatalog {
    fn list_markers(&self) -> BoxFuture<'_, Result<Vec<MarkerDescriptor>, CatalogError>> {
        Box::pin(async move {
            let url = self.markers_url();
            let body = self.get_bytes(&url).await?;
            let markers = parse_catalog(&body)?;
            tracing::debug!(url = %url, count = markers.len(), "Fetched marker catalog");
            Ok(markers)
        })
    }

    fn fetch_image<'a>(&'a self, image: &'a MediaRef) -> BoxFuture<'a, Result<Vec<u8>, CatalogError>> {
        Box::pin(async move { self.get_bytes(&self.resolve(image)).await })
    }
}

// =============================================================================
// File catalog
// =============================================================================

/// Catalog backed by a JSON export on disk.
///
/// Relative image references are resolved against the directory holding the
/// catalog file.
#[derive(Debug, Clone)]
pub struct FileMarkerCatalog {
    path: PathBuf,
}

impl FileMarkerCatalog {
    /// Create a catalog reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn resolve(&self, media: &MediaRef) -> PathBuf {
        let location = Path::new(media.as_str());
        if location.is_absolute() {
            return location.to_path_buf();
        }
        match self.path.parent() {
            Some(dir) => dir.join(location),
            None => location.to_path_buf(),
        }
    }
}

async fn read_file(path: PathBuf) -> Result<Vec<u8>, CatalogError> {
    tokio::fs::read(&path)
        .await
        .map_err(|source| CatalogError::Io { path, source })
}

impl MarkerCatalog for FileMarkerCatalog {
    fn list_markers(&self) -> BoxFuture<'_, Result<Vec<MarkerDescriptor>, CatalogError>> {
        Box::pin(async move {
            let body = read_file(self.path.clone()).await?;
            parse_catalog(&body)
        })
    }

    fn fetch_image<'a>(&'a self, image: &'a MediaRef) -> BoxFuture<'a, Result<Vec<u8>, CatalogError>> {
        Box::pin(async move {
            if image.is_url() {
                return Err(CatalogError::Http(format!(
                    "file catalog cannot fetch remote image {}",
                    image
                )));
            }
            read_file(self.resolve(image)).await
        })
    }
}
