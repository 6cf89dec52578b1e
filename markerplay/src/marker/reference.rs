//! Reference image loading.
//!
//! Tracking providers consume decoded bitmaps, not URLs. Before a session
//! starts, each marker's image is fetched from the catalog and decoded to an
//! RGBA bitmap. Markers that cannot be prepared are dropped *before* slot
//! assignment so that slot indices line up with the markers the provider
//! actually received.

use image::RgbaImage;

use super::catalog::MarkerCatalog;
use super::model::MarkerDescriptor;
use crate::tracking::ReferenceImage;

/// Markers that made it through image preparation, in slot order.
#[derive(Debug, Default)]
pub struct LoadedMarkers {
    /// Descriptors whose images decoded successfully.
    pub descriptors: Vec<MarkerDescriptor>,
    /// Reference images, index-aligned with `descriptors`.
    pub images: Vec<ReferenceImage>,
    /// Markers that were skipped, with the reason.
    pub skipped: Vec<(MarkerDescriptor, String)>,
}

impl LoadedMarkers {
    /// Number of markers ready for tracking.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no marker could be prepared.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Decode raw image bytes into an RGBA bitmap.
pub fn decode_bitmap(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Fetch and decode the reference image of every marker.
///
/// Images are loaded one after another; a failure only skips that marker.
pub async fn load_reference_images(
    catalog: &dyn MarkerCatalog,
    markers: Vec<MarkerDescriptor>,
) -> LoadedMarkers {
    let mut loaded = LoadedMarkers::default();

    for marker in markers {
        if !marker.has_valid_width() {
            tracing::warn!(
                marker_id = %marker.id,
                width = marker.physical_width_m,
                "Skipping marker with invalid physical width"
            );
            let reason = format!("invalid physical width {}", marker.physical_width_m);
            loaded.skipped.push((marker, reason));
            continue;
        }

        let bytes = match catalog.fetch_image(&marker.image_ref).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(marker_id = %marker.id, error = %e, "Failed to fetch marker image");
                loaded.skipped.push((marker, e.to_string()));
                continue;
            }
        };

        match decode_bitmap(&bytes) {
            Ok(bitmap) => {
                tracing::debug!(
                    marker_id = %marker.id,
                    width_px = bitmap.width(),
                    height_px = bitmap.height(),
                    "Decoded marker image"
                );
                loaded.images.push(ReferenceImage::new(bitmap, marker.physical_width_m));
                loaded.descriptors.push(marker);
            }
            Err(e) => {
                tracing::warn!(marker_id = %marker.id, error = %e, "Failed to decode marker image");
                loaded.skipped.push((marker, e.to_string()));
            }
        }
    }

    loaded
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Cursor;

    use futures::future::BoxFuture;

    use super::*;
    use crate::marker::{CatalogError, MediaRef};

    struct MapCatalog {
        images: HashMap<String, Vec<u8>>,
    }

    impl MarkerCatalog for MapCatalog {
        fn list_markers(&self) -> BoxFuture<'_, Result<Vec<MarkerDescriptor>, CatalogError>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn fetch_image<'a>(
            &'a self,
            image: &'a MediaRef,
        ) -> BoxFuture<'a, Result<Vec<u8>, CatalogError>> {
            Box::pin(async move {
                self.images
                    .get(image.as_str())
                    .cloned()
                    .ok_or_else(|| CatalogError::Status {
                        url: image.to_string(),
                        status: 404,
                    })
            })
        }
    }

    fn png_bytes() -> Vec<u8> {
        let bitmap = RgbaImage::from_pixel(4, 3, image::Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        bitmap.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn marker(id: &str, image: &str, width: f64) -> MarkerDescriptor {
        MarkerDescriptor::new(
            id,
            format!("Marker {}", id),
            MediaRef::new(image),
            MediaRef::new(format!("{}.mp4", id)),
            width,
        )
    }

    #[test]
    fn test_decode_bitmap() {
        let bitmap = decode_bitmap(&png_bytes()).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 3));
    }

    #[test]
    fn test_decode_bitmap_rejects_garbage() {
        assert!(decode_bitmap(b"not an image").is_err());
    }

    #[tokio::test]
    async fn test_load_skips_unusable_markers_and_keeps_order() {
        let mut images = HashMap::new();
        images.insert("a.png".to_string(), png_bytes());
        images.insert("broken.png".to_string(), b"garbage".to_vec());
        images.insert("c.png".to_string(), png_bytes());
        let catalog = MapCatalog { images };

        let markers = vec![
            marker("a", "a.png", 0.2),
            marker("missing", "missing.png", 0.2),
            marker("broken", "broken.png", 0.2),
            marker("zero", "a.png", 0.0),
            marker("c", "c.png", 0.4),
        ];

        let loaded = load_reference_images(&catalog, markers).await;

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.descriptors[0].id.as_str(), "a");
        assert_eq!(loaded.descriptors[1].id.as_str(), "c");
        assert_eq!(loaded.images[1].width_in_meters, 0.4);
        assert_eq!(loaded.skipped.len(), 3);
    }
}
