//! Tracking error taxonomy.

use thiserror::Error;

/// Errors raised by the tracking session adapter and providers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackingError {
    /// The platform lacks image-tracking support.
    #[error("Image tracking is not supported on this platform")]
    Unsupported,

    /// The provider rejected the reference image set.
    #[error("Failed to initialize tracking: {0}")]
    Init(String),

    /// A session is already live on this adapter.
    #[error("A tracking session is already active")]
    SessionActive,

    /// The provider failed while a session was running.
    #[error("Tracking provider error: {0}")]
    Provider(String),
}

impl TrackingError {
    /// Whether the error prevents entering the detection loop and should be
    /// shown to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, TrackingError::Unsupported | TrackingError::Init(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_visible_errors() {
        assert!(TrackingError::Unsupported.is_user_visible());
        assert!(TrackingError::Init("zero width".into()).is_user_visible());
        assert!(!TrackingError::SessionActive.is_user_visible());
        assert!(!TrackingError::Provider("lost camera".into()).is_user_visible());
    }

    #[test]
    fn test_display() {
        let err = TrackingError::Init("no valid images to track".into());
        assert_eq!(
            err.to_string(),
            "Failed to initialize tracking: no valid images to track"
        );
    }
}
