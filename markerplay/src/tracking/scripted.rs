//! Scripted tracking provider.
//!
//! Replays a recorded sequence of frames at a fixed frame interval, standing
//! in for the device frame clock. Scripts are JSON:
//!
//! ```json
//! { "frames": [
//!     { "results": [ { "index": 0, "state": "tracked" } ] },
//!     { "results": [ { "index": 0, "state": "limited" } ] }
//! ] }
//! ```

use std::path::Path;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::error::TrackingError;
use super::provider::{
    FrameBatch, ImageTrackingProvider, ProviderSession, RawTrackingResult, ReferenceImage,
};

/// Default frame interval (about one 60 Hz display refresh).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// One recorded frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default)]
    pub results: Vec<RawTrackingResult>,
}

/// A recorded frame sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameScript {
    pub frames: Vec<ScriptedFrame>,
}

impl FrameScript {
    /// Build a script from frames.
    pub fn new(frames: Vec<ScriptedFrame>) -> Self {
        Self { frames }
    }

    /// Parse a JSON script.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse a JSON script file.
    pub async fn load(path: &Path) -> Result<Self, TrackingError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            TrackingError::Init(format!("failed to read frame script {}: {}", path.display(), e))
        })?;
        Self::from_json(&json).map_err(|e| {
            TrackingError::Init(format!("invalid frame script {}: {}", path.display(), e))
        })
    }

    /// Highest slot index referenced by any frame.
    pub fn max_index(&self) -> Option<usize> {
        self.frames
            .iter()
            .flat_map(|frame| frame.results.iter().map(|r| r.index))
            .max()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Provider replaying a [`FrameScript`].
#[derive(Debug, Clone)]
pub struct ScriptedTrackingProvider {
    script: FrameScript,
    frame_interval: Duration,
    hold_open: bool,
}

impl ScriptedTrackingProvider {
    /// Replay `script` at the default frame interval, ending the session after
    /// the last frame.
    pub fn new(script: FrameScript) -> Self {
        Self {
            script,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            hold_open: false,
        }
    }

    /// Set the delay before each frame.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Keep the session open (delivering nothing) after the last frame,
    /// until it is stopped.
    pub fn hold_open(mut self, hold_open: bool) -> Self {
        self.hold_open = hold_open;
        self
    }
}

impl ImageTrackingProvider for ScriptedTrackingProvider {
    fn is_supported(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }

    fn request_session(
        &self,
        images: Vec<ReferenceImage>,
    ) -> BoxFuture<'_, Result<Box<dyn ProviderSession>, TrackingError>> {
        Box::pin(async move {
            if images.is_empty() {
                return Err(TrackingError::Init("no reference images".to_string()));
            }
            for (slot, image) in images.iter().enumerate() {
                image
                    .validate()
                    .map_err(|reason| TrackingError::Init(format!("slot {}: {}", slot, reason)))?;
            }
            if let Some(max) = self.script.max_index() {
                if max >= images.len() {
                    tracing::warn!(
                        max_index = max,
                        images = images.len(),
                        "Frame script references slots beyond the registered images"
                    );
                }
            }

            let session = ScriptedSession {
                frames: self.script.frames.clone().into_iter(),
                frame_interval: self.frame_interval,
                hold_open: self.hold_open,
                ended: false,
            };
            Ok(Box::new(session) as Box<dyn ProviderSession>)
        })
    }
}

struct ScriptedSession {
    frames: std::vec::IntoIter<ScriptedFrame>,
    frame_interval: Duration,
    hold_open: bool,
    ended: bool,
}

impl ProviderSession for ScriptedSession {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<FrameBatch, TrackingError>>> {
        Box::pin(async move {
            if self.ended {
                return None;
            }

            match self.frames.next() {
                Some(frame) => {
                    if self.frame_interval.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(self.frame_interval).await;
                    }
                    Some(Ok(FrameBatch::now(frame.results)))
                }
                None if self.hold_open => futures::future::pending().await,
                None => None,
            }
        })
    }

    fn end(&mut self) {
        self.ended = true;
    }
}
