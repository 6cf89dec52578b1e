use thiserror::Error;

use crate::marker::CatalogError;
use crate::tracking::TrackingError;

/// Errors starting a scan session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The marker catalog could not be read.
    #[error("Failed to load markers: {0}")]
    Catalog(#[from] CatalogError),

    /// The tracking session could not be started.
    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

impl SessionError {
    /// The tracking error behind this failure, if any.
    pub fn tracking(&self) -> Option<&TrackingError> {
        match self {
            SessionError::Tracking(e) => Some(e),
            SessionError::Catalog(_) => None,
        }
    }
}
