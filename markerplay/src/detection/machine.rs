//! Detection state machine.
//!
//! Consumes normalized tracking samples and turns state crossings into
//! playback commands and analytics events.
//!
//! # State Transitions
//!
//! ```text
//!               tracked = true
//!               scan → play → play event
//!        ┌─────────────────────────────────┐
//!        │                                 ▼
//!   ┌─────────┐                      ┌──────────┐
//!   │  Idle   │                      │ Detected │
//!   └─────────┘                      └──────────┘
//!        ▲                                 │
//!        └─────────────────────────────────┘
//!               tracked = false
//!               pause → pause event
//! ```
//!
//! Same-state samples are no-ops. There is no debounce window, so a marker
//! flickering at the tracking boundary produces one crossing per flip.
//!
//! Teardown forces every detected marker back to idle and pauses it without
//! a pause event. After teardown the machine is closed and ignores samples.

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::observer::{DetectionObservers, DetectionSnapshot, MarkerTransition};
use super::state::{MarkerRuntimeState, SessionContext};
use crate::analytics::{AnalyticsEmitter, AnalyticsEvent, EventType};
use crate::marker::MarkerId;
use crate::playback::PlaybackController;
use crate::tracking::{FrameConsumer, SessionEnd, TrackingSample};

/// A crossing produced by one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// Idle → Detected.
    Found,
    /// Detected → Idle.
    Lost,
}

/// Per-session detection state machine.
///
/// Runs entirely on the frame loop task; nothing here is locked.
pub struct DetectionStateMachine {
    context: SessionContext,
    playback: PlaybackController,
    analytics: AnalyticsEmitter,
    observers: DetectionObservers,
    detected_count: usize,
    closed: bool,
}

impl DetectionStateMachine {
    /// Create a machine for a fresh session context.
    pub fn new(
        context: SessionContext,
        playback: PlaybackController,
        analytics: AnalyticsEmitter,
    ) -> Self {
        let detected_count = context.count_detected();
        let observers = DetectionObservers::new(DetectionSnapshot::from_context(&context, true));

        Self {
            context,
            playback,
            analytics,
            observers,
            detected_count,
            closed: false,
        }
    }

    /// Latest aggregate state. The receiver stays valid after the machine is
    /// dropped and then holds the final snapshot.
    pub fn status(&self) -> watch::Receiver<DetectionSnapshot> {
        self.observers.subscribe_status()
    }

    /// Stream of crossings from now on.
    pub fn transitions(&self) -> broadcast::Receiver<MarkerTransition> {
        self.observers.subscribe_transitions()
    }

    /// Number of markers currently detected.
    pub fn detected_count(&self) -> usize {
        self.detected_count
    }

    pub fn state_of(&self, marker_id: &MarkerId) -> Option<MarkerRuntimeState> {
        self.context.state(marker_id)
    }

    /// Whether teardown has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Apply one sample. Returns the crossing it caused, if any.
    pub fn apply(&mut self, sample: &TrackingSample) -> Option<Crossing> {
        if self.closed {
            debug!(slot = sample.slot, "Sample after teardown ignored");
            return None;
        }

        let Some(marker) = self.context.slots().get(sample.slot).cloned() else {
            debug!(slot = sample.slot, "Sample for unknown slot ignored");
            return None;
        };

        let current = self.context.state(&marker.id)?;
        let crossing = match (current, sample.tracked) {
            (MarkerRuntimeState::Idle, true) => {
                self.on_found(&marker.id, &marker.title);
                Crossing::Found
            }
            (MarkerRuntimeState::Detected, false) => {
                self.on_lost(&marker.id);
                Crossing::Lost
            }
            _ => return None,
        };

        debug_assert_eq!(self.detected_count, self.context.count_detected());
        Some(crossing)
    }

    /// Apply every sample of one frame, then publish a snapshot if anything
    /// changed.
    pub fn process_frame(&mut self, samples: &[TrackingSample]) -> usize {
        let crossings = samples
            .iter()
            .filter(|sample| self.apply(sample).is_some())
            .count();

        if crossings > 0 {
            self.publish_snapshot();
        }
        crossings
    }

    /// Force every detected marker to idle, release playback and close the
    /// machine. No pause analytics are emitted. Idempotent.
    pub fn teardown(&mut self, end: &SessionEnd) {
        if self.closed {
            return;
        }
        self.closed = true;

        let detected: Vec<MarkerId> = self
            .context
            .detected_markers()
            .map(|marker| marker.id.clone())
            .collect();

        for marker_id in &detected {
            if let Err(e) = self.playback.pause(marker_id) {
                warn!(marker_id = %marker_id, error = %e, "Pause on teardown failed");
            }
            self.context.set_state(marker_id, MarkerRuntimeState::Idle);
        }
        self.detected_count = 0;
        self.playback.release_all();

        info!(
            session_id = %self.context.session_id(),
            paused = detected.len(),
            end = ?end,
            "Detection session closed"
        );
        self.publish_snapshot();
    }

    fn on_found(&mut self, marker_id: &MarkerId, title: &str) {
        self.context
            .set_state(marker_id, MarkerRuntimeState::Detected);
        self.detected_count += 1;

        info!(
            session_id = %self.context.session_id(),
            marker_id = %marker_id,
            detected = self.detected_count,
            "Marker detected"
        );

        self.emit(marker_id, EventType::Scan);
        match self.playback.play(marker_id) {
            Ok(()) => self.emit(marker_id, EventType::Play),
            Err(e) => warn!(marker_id = %marker_id, error = %e, "Play failed"),
        }

        self.observers.publish_transition(MarkerTransition::Detected {
            marker_id: marker_id.clone(),
            title: title.to_string(),
        });
    }

    fn on_lost(&mut self, marker_id: &MarkerId) {
        self.context.set_state(marker_id, MarkerRuntimeState::Idle);
        self.detected_count -= 1;

        info!(
            session_id = %self.context.session_id(),
            marker_id = %marker_id,
            detected = self.detected_count,
            "Marker lost"
        );

        if let Err(e) = self.playback.pause(marker_id) {
            warn!(marker_id = %marker_id, error = %e, "Pause failed");
        }
        self.emit(marker_id, EventType::Pause);

        self.observers.publish_transition(MarkerTransition::Lost {
            marker_id: marker_id.clone(),
        });
    }

    fn emit(&self, marker_id: &MarkerId, event_type: EventType) {
        self.analytics.emit(AnalyticsEvent::new(
            marker_id.clone(),
            event_type,
            self.context.session_id().clone(),
        ));
    }

    fn publish_snapshot(&self) {
        self.observers
            .publish_snapshot(DetectionSnapshot::from_context(&self.context, !self.closed));
    }
}

impl FrameConsumer for DetectionStateMachine {
    fn on_frame(&mut self, samples: &[TrackingSample]) {
        self.process_frame(samples);
    }

    fn on_session_end(&mut self, end: &SessionEnd) {
        self.teardown(end);
    }
}

impl std::fmt::Debug for DetectionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionStateMachine")
            .field("session_id", self.context.session_id())
            .field("markers", &self.context.marker_count())
            .field("detected", &self.detected_count)
            .field("closed", &self.closed)
            .finish()
    }
}
