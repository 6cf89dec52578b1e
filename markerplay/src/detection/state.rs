//! Per-session runtime state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::marker::{MarkerDescriptor, MarkerId};
use crate::session::SessionId;
use crate::tracking::TrackingSlots;

/// Runtime state of one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerRuntimeState {
    /// Not tracked; video paused.
    #[default]
    Idle,
    /// Tracked; video playing.
    Detected,
}

/// State of one live AR session.
///
/// Created with every marker `Idle`. Only the detection state machine
/// mutates it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: SessionId,
    started_at: DateTime<Utc>,
    slots: TrackingSlots,
    states: HashMap<MarkerId, MarkerRuntimeState>,
}

impl SessionContext {
    /// New context with one `Idle` entry per slot.
    pub fn new(session_id: SessionId, slots: TrackingSlots) -> Self {
        let states = slots
            .iter()
            .map(|marker| (marker.id.clone(), MarkerRuntimeState::Idle))
            .collect();

        Self {
            session_id,
            started_at: Utc::now(),
            slots,
            states,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn slots(&self) -> &TrackingSlots {
        &self.slots
    }

    /// Number of markers in the session.
    pub fn marker_count(&self) -> usize {
        self.states.len()
    }

    /// State of a marker, `None` if it is not part of the session.
    pub fn state(&self, marker_id: &MarkerId) -> Option<MarkerRuntimeState> {
        self.states.get(marker_id).copied()
    }

    pub(crate) fn set_state(&mut self, marker_id: &MarkerId, state: MarkerRuntimeState) {
        if let Some(entry) = self.states.get_mut(marker_id) {
            *entry = state;
        }
    }

    /// Detected markers, in slot order.
    pub fn detected_markers(&self) -> impl Iterator<Item = &Arc<MarkerDescriptor>> + '_ {
        self.slots
            .iter()
            .filter(|marker| self.state(&marker.id) == Some(MarkerRuntimeState::Detected))
    }

    /// Count of detected markers by full scan. The state machine keeps its own
    /// incremental count; this is the reference value it must agree with.
    pub fn count_detected(&self) -> usize {
        self.states
            .values()
            .filter(|state| **state == MarkerRuntimeState::Detected)
            .count()
    }
}
