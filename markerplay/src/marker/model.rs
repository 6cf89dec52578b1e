//! Marker data model.
//!
//! A marker is a printed reference image paired with a video and the image's
//! physical width. Descriptors are owned by the catalog and held read-only
//! (behind `Arc`) once a tracking session is set up.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical width assigned to catalog records that do not carry one.
pub const DEFAULT_PHYSICAL_WIDTH_M: f64 = 0.2;

/// Catalog identity of a marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    /// Create a marker id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MarkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque reference to a media resource (URL or file path).
///
/// The core never interprets the value; it is handed back to the catalog
/// to fetch the image and to the playback factory to open the video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    /// Create a media reference.
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// The raw location string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is an absolute `http(s)` URL.
    pub fn is_url(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the core needs to know about one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDescriptor {
    /// Catalog id.
    pub id: MarkerId,
    /// Human-readable title shown when the marker is found.
    pub title: String,
    /// Reference image to track.
    pub image_ref: MediaRef,
    /// Video played while the marker is tracked.
    pub video_ref: MediaRef,
    /// Printed width of the reference image in metres.
    pub physical_width_m: f64,
}

impl MarkerDescriptor {
    /// Create a new descriptor.
    pub fn new(
        id: impl Into<MarkerId>,
        title: impl Into<String>,
        image_ref: MediaRef,
        video_ref: MediaRef,
        physical_width_m: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_ref,
            video_ref,
            physical_width_m,
        }
    }

    /// Tracking providers need a finite, strictly positive width.
    pub fn has_valid_width(&self) -> bool {
        self.physical_width_m.is_finite() && self.physical_width_m > 0.0
    }
}

/// Marker record as served by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: String,
    pub title: String,
    pub marker_image_url: String,
    pub video_url: String,
    #[serde(default = "default_physical_width")]
    pub physical_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_physical_width() -> f64 {
    DEFAULT_PHYSICAL_WIDTH_M
}

impl From<MarkerRecord> for MarkerDescriptor {
    fn from(record: MarkerRecord) -> Self {
        Self {
            id: MarkerId::new(record.id),
            title: record.title,
            image_ref: MediaRef::new(record.marker_image_url),
            video_ref: MediaRef::new(record.video_url),
            physical_width_m: record.physical_width,
        }
    }
}
