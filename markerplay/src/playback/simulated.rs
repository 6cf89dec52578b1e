//! Simulated playback for headless runs.
//!
//! Keeps a virtual playhead per marker and logs every command. Used by the
//! CLI scanner, where there is no display to render video on.

use std::time::{Duration, Instant};

use tracing::info;

use super::handle::{PlaybackError, PlaybackFactory, PlaybackHandle};
use crate::marker::{MarkerDescriptor, MarkerId, MediaRef};

/// Virtual video player tracking elapsed playback time.
#[derive(Debug)]
pub struct SimulatedPlayback {
    marker_id: MarkerId,
    video: MediaRef,
    position: Duration,
    playing_since: Option<Instant>,
    released: bool,
}

impl SimulatedPlayback {
    pub fn new(marker_id: MarkerId, video: MediaRef) -> Self {
        Self {
            marker_id,
            video,
            position: Duration::ZERO,
            playing_since: None,
            released: false,
        }
    }

    /// Current playhead position.
    pub fn position(&self) -> Duration {
        match self.playing_since {
            Some(since) => self.position + since.elapsed(),
            None => self.position,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }
}

impl PlaybackHandle for SimulatedPlayback {
    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.released {
            return Err(PlaybackError::resource(&self.marker_id, "player released"));
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            info!(
                marker_id = %self.marker_id,
                video = %self.video,
                position_ms = self.position.as_millis() as u64,
                "Video playing"
            );
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        if let Some(since) = self.playing_since.take() {
            self.position += since.elapsed();
            info!(
                marker_id = %self.marker_id,
                position_ms = self.position.as_millis() as u64,
                "Video paused"
            );
        }
        Ok(())
    }

    fn release(&mut self) {
        self.playing_since = None;
        self.released = true;
    }
}

/// Factory producing [`SimulatedPlayback`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPlaybackFactory;

impl PlaybackFactory for SimulatedPlaybackFactory {
    fn create(&self, marker: &MarkerDescriptor) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        Ok(Box::new(SimulatedPlayback::new(
            marker.id.clone(),
            marker.video_ref.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> SimulatedPlayback {
        SimulatedPlayback::new(MarkerId::new("m1"), MediaRef::new("m1.mp4"))
    }

    #[test]
    fn test_resume_keeps_position() {
        let mut player = player();
        player.play().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        player.pause().unwrap();

        let paused_at = player.position();
        assert!(paused_at >= Duration::from_millis(5));

        player.play().unwrap();
        assert!(player.is_playing());
        assert!(player.position() >= paused_at, "resume does not rewind");
    }

    #[test]
    fn test_play_after_release_fails() {
        let mut player = player();
        player.release();
        assert!(matches!(
            player.play(),
            Err(PlaybackError::Resource { .. })
        ));
    }
}
