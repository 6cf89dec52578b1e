//! Per-marker video playback.
//!
//! The [`PlaybackController`] owns one [`PlaybackHandle`] per marker,
//! created through a [`PlaybackFactory`] when the session starts and released
//! when it ends. Handles are independent: a failure on one marker never
//! affects another.

mod controller;
mod handle;
mod simulated;

pub use controller::PlaybackController;
pub use handle::{PlaybackError, PlaybackFactory, PlaybackHandle};
pub use simulated::{SimulatedPlayback, SimulatedPlaybackFactory};
