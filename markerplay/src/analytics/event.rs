//! Analytics event records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marker::MarkerId;
use crate::session::SessionId;

/// Kind of engagement being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Marker entered the camera view.
    Scan,
    /// Marker video started or resumed.
    Play,
    /// Marker video paused because tracking was lost.
    Pause,
    /// Marker video played to the end.
    Complete,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Scan => "scan",
            EventType::Play => "play",
            EventType::Pause => "pause",
            EventType::Complete => "complete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable analytics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub marker_id: MarkerId,
    pub event_type: EventType,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Event stamped with the current time.
    pub fn new(marker_id: MarkerId, event_type: EventType, session_id: SessionId) -> Self {
        Self {
            marker_id,
            event_type,
            session_id,
            timestamp: Utc::now(),
        }
    }
}
