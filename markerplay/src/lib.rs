//! markerplay - marker-triggered video playback for AR viewers
//!
//! A tracking provider reports which printed markers the camera sees; each
//! marker that comes into view starts its video, and each marker that leaves
//! view pauses it. Scan, play and pause events are sent to an analytics
//! service in the background.
//!
//! # Modules
//!
//! - [`marker`]: catalog clients and reference image loading
//! - [`tracking`]: provider contract and the tracking session adapter
//! - [`detection`]: the per-marker `Idle`/`Detected` state machine
//! - [`playback`]: per-marker video handles
//! - [`analytics`]: fire-and-forget event delivery
//! - [`session`]: wiring everything into a scan session
//! - [`config`]: INI configuration
//! - [`logging`]: tracing subscriber setup

pub mod analytics;
pub mod config;
pub mod detection;
pub mod logging;
pub mod marker;
pub mod playback;
pub mod session;
pub mod tracking;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
