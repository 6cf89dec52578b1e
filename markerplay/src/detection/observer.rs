//! Observer surface of the detection state machine.
//!
//! Observers get two views: a [`DetectionSnapshot`] on a `watch` channel
//! (latest aggregate state, for badges like "2 / 5 detected") and a stream of
//! [`MarkerTransition`]s on a `broadcast` channel (for "marker found"
//! notifications). Both are derived from the runtime state; neither is
//! consulted by the state machine itself.

use tokio::sync::{broadcast, watch};

use super::state::SessionContext;
use crate::marker::MarkerId;
use crate::session::SessionId;

/// Capacity of the transition broadcast channel.
pub const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// A detected marker as shown to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedMarker {
    pub id: MarkerId,
    pub title: String,
}

/// Point-in-time view of a session's detection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionSnapshot {
    pub session_id: Option<SessionId>,
    /// Whether the session still accepts samples.
    pub active: bool,
    pub marker_count: usize,
    pub detected_count: usize,
    /// Detected markers in slot order.
    pub detected: Vec<DetectedMarker>,
}

impl DetectionSnapshot {
    /// Derive a snapshot from the session context.
    pub fn from_context(context: &SessionContext, active: bool) -> Self {
        let detected: Vec<DetectedMarker> = context
            .detected_markers()
            .map(|marker| DetectedMarker {
                id: marker.id.clone(),
                title: marker.title.clone(),
            })
            .collect();

        Self {
            session_id: Some(context.session_id().clone()),
            active,
            marker_count: context.marker_count(),
            detected_count: detected.len(),
            detected,
        }
    }
}

/// One marker crossing, as broadcast to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTransition {
    /// Marker went from idle to detected.
    Detected { marker_id: MarkerId, title: String },
    /// Marker tracking was lost.
    Lost { marker_id: MarkerId },
}

impl MarkerTransition {
    pub fn marker_id(&self) -> &MarkerId {
        match self {
            MarkerTransition::Detected { marker_id, .. } => marker_id,
            MarkerTransition::Lost { marker_id } => marker_id,
        }
    }
}

/// Sender halves owned by the state machine.
#[derive(Debug)]
pub(crate) struct DetectionObservers {
    status: watch::Sender<DetectionSnapshot>,
    transitions: broadcast::Sender<MarkerTransition>,
}

impl DetectionObservers {
    pub(crate) fn new(initial: DetectionSnapshot) -> Self {
        let (status, _) = watch::channel(initial);
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            status,
            transitions,
        }
    }

    pub(crate) fn subscribe_status(&self) -> watch::Receiver<DetectionSnapshot> {
        self.status.subscribe()
    }

    pub(crate) fn subscribe_transitions(&self) -> broadcast::Receiver<MarkerTransition> {
        self.transitions.subscribe()
    }

    pub(crate) fn publish_snapshot(&self, snapshot: DetectionSnapshot) {
        // No receivers is fine; the value is kept for late subscribers.
        self.status.send_replace(snapshot);
    }

    pub(crate) fn publish_transition(&self, transition: MarkerTransition) {
        let _ = self.transitions.send(transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::MarkerRuntimeState;
    use crate::marker::{MarkerDescriptor, MediaRef};
    use crate::tracking::TrackingSlots;

    #[test]
    fn test_snapshot_from_context() {
        let slots = TrackingSlots::new(vec![
            MarkerDescriptor::new("m1", "Poster", MediaRef::new("a"), MediaRef::new("b"), 0.2),
            MarkerDescriptor::new("m2", "Flyer", MediaRef::new("c"), MediaRef::new("d"), 0.2),
        ])
        .unwrap();
        let mut context = SessionContext::new(SessionId::new("s1"), slots);
        context.set_state(&MarkerId::new("m2"), MarkerRuntimeState::Detected);

        let snapshot = DetectionSnapshot::from_context(&context, true);
        assert_eq!(snapshot.marker_count, 2);
        assert_eq!(snapshot.detected_count, 1);
        assert_eq!(snapshot.detected[0].title, "Flyer");
        assert!(snapshot.active);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let observers = DetectionObservers::new(DetectionSnapshot::default());
        observers.publish_transition(MarkerTransition::Lost {
            marker_id: MarkerId::new("m1"),
        });

        let rx = observers.subscribe_status();
        observers.publish_snapshot(DetectionSnapshot {
            detected_count: 3,
            ..Default::default()
        });
        assert_eq!(rx.borrow().detected_count, 3);
    }
}
