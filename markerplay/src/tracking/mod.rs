//! Tracking session adapter and provider contract.
//!
//! The adapter owns the lifecycle of an image-tracking session and converts
//! raw provider frames into normalized `(slot, tracked)` samples.
//!
//! # Normalization
//!
//! Providers report one of `tracked`, `limited` or `emulated` per image. Under
//! the default [`TrackingPolicy::Strict`] only `tracked` counts as tracked,
//! so marginal tracking never triggers playback.
//!
//! # Example
//!
//! ```ignore
//! use markerplay::tracking::{ScriptedTrackingProvider, TrackingSessionAdapter, TrackingSlots};
//!
//! let adapter = TrackingSessionAdapter::new(Arc::new(provider));
//! let mut handle = adapter.start(&slots, images, consumer).await?;
//! // ...
//! handle.stop().await;
//! ```

mod adapter;
mod channel;
mod error;
mod policy;
mod provider;
mod scripted;
mod slots;

pub use adapter::{
    normalize_frame, FrameConsumer, SessionEnd, SessionHandle, TrackingSample,
    TrackingSessionAdapter,
};
pub use channel::{ChannelTrackingProvider, FrameSender};
pub use error::TrackingError;
pub use policy::{TrackingPolicy, TrackingState};
pub use provider::{
    FrameBatch, ImageTrackingProvider, Pose, ProviderSession, RawTrackingResult, ReferenceImage,
};
pub use scripted::{FrameScript, ScriptedFrame, ScriptedTrackingProvider, DEFAULT_FRAME_INTERVAL_MS};
pub use slots::TrackingSlots;
