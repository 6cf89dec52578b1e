//! Marker catalog model and client.
//!
//! Markers are read from the catalog service once, at session setup, and
//! their reference images are decoded before the tracking session starts.
//!
//! # Example
//!
//! ```ignore
//! use markerplay::marker::{load_reference_images, HttpMarkerCatalog, MarkerCatalog};
//!
//! let catalog = HttpMarkerCatalog::new("https://ads.example.com")?;
//! let markers = catalog.list_markers().await?;
//! let loaded = load_reference_images(&catalog, markers).await;
//! ```

mod catalog;
mod model;
mod reference;

pub use catalog::{
    parse_catalog, CatalogError, FileMarkerCatalog, HttpMarkerCatalog, MarkerCatalog,
    DEFAULT_CATALOG_TIMEOUT_SECS,
};
pub use model::{MarkerDescriptor, MarkerId, MarkerRecord, MediaRef, DEFAULT_PHYSICAL_WIDTH_M};
pub use reference::{decode_bitmap, load_reference_images, LoadedMarkers};
