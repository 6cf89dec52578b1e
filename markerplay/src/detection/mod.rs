//! Marker detection.
//!
//! Turns the stream of normalized tracking samples into per-marker
//! `Idle`/`Detected` state, playback commands and analytics events.
//!
//! ```text
//! TrackingSessionAdapter ──on_frame()──► DetectionStateMachine ──► PlaybackController
//!                                              │       │
//!                                              │       └─────────► AnalyticsEmitter
//!                                              ▼
//!                               watch<DetectionSnapshot> / broadcast<MarkerTransition>
//! ```

mod machine;
mod observer;
mod state;

pub use machine::{Crossing, DetectionStateMachine};
pub use observer::{
    DetectedMarker, DetectionSnapshot, MarkerTransition, TRANSITION_CHANNEL_CAPACITY,
};
pub use state::{MarkerRuntimeState, SessionContext};
