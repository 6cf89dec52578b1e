//! Playback handle abstraction.

use thiserror::Error;

use crate::marker::{MarkerDescriptor, MarkerId};

/// Errors from playback commands. Always isolated to one marker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// No handle was created for the marker.
    #[error("No playback handle for marker {0}")]
    MissingHandle(MarkerId),

    /// The underlying player rejected the command.
    #[error("Playback failed for marker {marker_id}: {reason}")]
    Resource { marker_id: MarkerId, reason: String },
}

impl PlaybackError {
    /// Convenience constructor for resource failures.
    pub fn resource(marker_id: &MarkerId, reason: impl Into<String>) -> Self {
        PlaybackError::Resource {
            marker_id: marker_id.clone(),
            reason: reason.into(),
        }
    }
}

/// Per-marker video output.
///
/// Commands must return promptly: implementations hand the work to their
/// player and report only whether the command was accepted.
pub trait PlaybackHandle: Send + 'static {
    /// Start or resume playback.
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Pause playback, keeping the position.
    fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Release the underlying resource. Called once at session end.
    fn release(&mut self) {}
}

/// Creates playback handles at session start.
pub trait PlaybackFactory: Send + Sync {
    /// Open the video of `marker`.
    fn create(&self, marker: &MarkerDescriptor) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}
