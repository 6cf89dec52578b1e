//! Playback controller.
//!
//! Exclusive owner of the marker → playback handle map. Commands are
//! idempotent per marker: `play` on a playing marker and `pause` on a paused
//! one are accepted without touching the handle.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::handle::{PlaybackError, PlaybackFactory, PlaybackHandle};
use crate::marker::MarkerId;
use crate::tracking::TrackingSlots;

struct PlaybackEntry {
    handle: Box<dyn PlaybackHandle>,
    playing: bool,
}

/// Executes play/pause commands against per-marker handles.
#[derive(Default)]
pub struct PlaybackController {
    entries: HashMap<MarkerId, PlaybackEntry>,
    released: bool,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("markers", &self.entries.len())
            .field("playing", &self.playing_count())
            .field("released", &self.released)
            .finish()
    }
}

impl PlaybackController {
    /// Empty controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one handle per slot.
    ///
    /// A marker whose handle cannot be created is logged and left without
    /// one; commands for it then fail with [`PlaybackError::MissingHandle`].
    pub fn from_factory(factory: &dyn PlaybackFactory, slots: &TrackingSlots) -> Self {
        let mut controller = Self::new();
        for marker in slots.iter() {
            match factory.create(marker) {
                Ok(handle) => controller.insert(marker.id.clone(), handle),
                Err(e) => {
                    warn!(marker_id = %marker.id, error = %e, "Failed to create playback handle");
                }
            }
        }
        controller
    }

    /// Register a handle for a marker, replacing any previous one.
    pub fn insert(&mut self, marker_id: MarkerId, handle: Box<dyn PlaybackHandle>) {
        if let Some(mut previous) = self.entries.insert(
            marker_id,
            PlaybackEntry {
                handle,
                playing: false,
            },
        ) {
            previous.handle.release();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_handle(&self, marker_id: &MarkerId) -> bool {
        self.entries.contains_key(marker_id)
    }

    /// Whether the marker's video is currently playing.
    pub fn is_playing(&self, marker_id: &MarkerId) -> bool {
        self.entries.get(marker_id).is_some_and(|entry| entry.playing)
    }

    /// Number of markers currently playing.
    pub fn playing_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.playing).count()
    }

    /// Start or resume a marker's video.
    pub fn play(&mut self, marker_id: &MarkerId) -> Result<(), PlaybackError> {
        let entry = self
            .entries
            .get_mut(marker_id)
            .ok_or_else(|| PlaybackError::MissingHandle(marker_id.clone()))?;

        if entry.playing {
            debug!(marker_id = %marker_id, "Already playing");
            return Ok(());
        }

        entry.handle.play()?;
        entry.playing = true;
        Ok(())
    }

    /// Pause a marker's video.
    pub fn pause(&mut self, marker_id: &MarkerId) -> Result<(), PlaybackError> {
        let entry = self
            .entries
            .get_mut(marker_id)
            .ok_or_else(|| PlaybackError::MissingHandle(marker_id.clone()))?;

        if !entry.playing {
            debug!(marker_id = %marker_id, "Already paused");
            return Ok(());
        }

        // A failed pause leaves the player in an unknown state; treat it as
        // paused so a later play re-issues the command.
        entry.playing = false;
        entry.handle.pause()
    }

    /// Pause anything still playing and release every handle. Idempotent.
    pub fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for (marker_id, entry) in self.entries.iter_mut() {
            if entry.playing {
                entry.playing = false;
                if let Err(e) = entry.handle.pause() {
                    warn!(marker_id = %marker_id, error = %e, "Pause on release failed");
                }
            }
            entry.handle.release();
        }
        self.entries.clear();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.release_all();
    }
}
