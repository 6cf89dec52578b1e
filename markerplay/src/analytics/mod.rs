//! Analytics emission.
//!
//! Scan, play and pause events are queued by the detection state machine and
//! delivered in the background. Delivery failures are logged and dropped;
//! they never reach the caller.
//!
//! # Example
//!
//! ```ignore
//! use markerplay::analytics::{AnalyticsEmitter, HttpAnalyticsSink};
//!
//! let sink = Arc::new(HttpAnalyticsSink::new("https://ads.example.com")?);
//! let (emitter, dispatcher) = AnalyticsEmitter::spawn(sink);
//! emitter.emit(event);
//! dispatcher.shutdown().await;
//! ```

mod emitter;
mod event;
mod sink;

pub use emitter::{AnalyticsDispatcher, AnalyticsEmitter, DispatchStats};
pub use event::{AnalyticsEvent, EventType};
pub use sink::{
    AnalyticsDeliveryError, AnalyticsSink, HttpAnalyticsSink, TracingAnalyticsSink,
    DEFAULT_ANALYTICS_TIMEOUT_SECS,
};
