//! Normalization of provider tracking states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tracking state reported by the provider for one reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    /// The image is actively and confidently tracked.
    Tracked,
    /// The image was seen but tracking quality is degraded.
    Limited,
    /// The pose is extrapolated; the image is not currently visible.
    Emulated,
}

/// Policy deciding which provider states count as "tracked".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingPolicy {
    /// Only `tracked` counts. Marginal tracking never starts a video.
    #[default]
    Strict,
    /// `tracked` and `limited` count; `emulated` never does.
    AcceptLimited,
}

impl TrackingPolicy {
    /// Map a provider state to the boolean the state machine consumes.
    pub fn is_tracked(self, state: TrackingState) -> bool {
        match (self, state) {
            (_, TrackingState::Tracked) => true,
            (TrackingPolicy::AcceptLimited, TrackingState::Limited) => true,
            _ => false,
        }
    }

    /// Config-file name of the policy.
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingPolicy::Strict => "strict",
            TrackingPolicy::AcceptLimited => "accept_limited",
        }
    }
}

impl fmt::Display for TrackingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(TrackingPolicy::Strict),
            "accept_limited" | "accept-limited" => Ok(TrackingPolicy::AcceptLimited),
            other => Err(format!(
                "unknown tracking policy '{}' (expected strict or accept_limited)",
                other
            )),
        }
    }
}
