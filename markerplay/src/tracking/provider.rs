//! Image tracking provider contract.
//!
//! The provider is the native AR runtime. Only its input (reference images
//! with physical widths) and output (per-frame tracking results) are modelled
//! here.

use std::time::Instant;

use futures::future::BoxFuture;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::error::TrackingError;
use super::policy::TrackingState;

/// Pose of a tracked image in the session's reference space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in metres.
    pub position: [f64; 3],
    /// Orientation quaternion `(x, y, z, w)`.
    pub orientation: [f64; 4],
}

/// One entry of a provider frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrackingResult {
    /// Positional index of the reference image.
    pub index: usize,
    /// Provider tracking state.
    pub state: TrackingState,
    /// Pose, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
}

impl RawTrackingResult {
    /// Result without pose.
    pub fn new(index: usize, state: TrackingState) -> Self {
        Self {
            index,
            state,
            pose: None,
        }
    }
}

/// All tracking results delivered for one presented frame.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    /// Frame presentation time.
    pub timestamp: Instant,
    /// Results in provider order. Slots may be absent.
    pub results: Vec<RawTrackingResult>,
}

impl FrameBatch {
    /// Batch stamped with the current time.
    pub fn now(results: Vec<RawTrackingResult>) -> Self {
        Self {
            timestamp: Instant::now(),
            results,
        }
    }
}

/// Decoded reference image handed to the provider.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub bitmap: RgbaImage,
    pub width_in_meters: f64,
}

impl ReferenceImage {
    /// Create a reference image.
    pub fn new(bitmap: RgbaImage, width_in_meters: f64) -> Self {
        Self {
            bitmap,
            width_in_meters,
        }
    }

    /// Check the image is acceptable to a provider.
    pub fn validate(&self) -> Result<(), String> {
        if self.bitmap.width() == 0 || self.bitmap.height() == 0 {
            return Err("reference image has no pixels".to_string());
        }
        if !(self.width_in_meters.is_finite() && self.width_in_meters > 0.0) {
            return Err(format!(
                "reference image width must be positive, got {}",
                self.width_in_meters
            ));
        }
        Ok(())
    }
}

/// Capability entry point of an image tracking runtime.
pub trait ImageTrackingProvider: Send + Sync + 'static {
    /// Whether the platform supports image tracking at all.
    fn is_supported(&self) -> BoxFuture<'_, bool>;

    /// Start a provider session tracking `images`. Slot `i` is `images[i]`.
    fn request_session(
        &self,
        images: Vec<ReferenceImage>,
    ) -> BoxFuture<'_, Result<Box<dyn ProviderSession>, TrackingError>>;
}

/// A live provider session.
pub trait ProviderSession: Send + 'static {
    /// Wait for the next presented frame.
    ///
    /// Returns `None` when the provider ended the session on its own, and
    /// `Some(Err(_))` on a fatal tracking failure.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<FrameBatch, TrackingError>>>;

    /// End the session and release the camera. Idempotent.
    fn end(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_image_validate() {
        let bitmap = RgbaImage::new(2, 2);
        assert!(ReferenceImage::new(bitmap.clone(), 0.2).validate().is_ok());
        assert!(ReferenceImage::new(bitmap, 0.0).validate().is_err());
        assert!(ReferenceImage::new(RgbaImage::new(0, 0), 0.2)
            .validate()
            .is_err());
    }

    #[test]
    fn test_raw_result_deserialize_without_pose() {
        let result: RawTrackingResult =
            serde_json::from_str(r#"{"index": 1, "state": "limited"}"#).unwrap();
        assert_eq!(result, RawTrackingResult::new(1, TrackingState::Limited));
    }
}
