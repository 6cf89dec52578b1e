//! Scan session setup.
//!
//! Ties the pieces together: the catalog is read, reference images are
//! prepared, and a detection state machine is registered as the tracking
//! session's frame consumer.
//!
//! ```text
//! MarkerCatalog ──list/fetch──► LoadedMarkers ──► TrackingSlots ─┬─► SessionContext
//!                                                                ├─► PlaybackController
//!                                                                └─► adapter.start(images, machine)
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::error::SessionError;
use super::id::SessionId;
use crate::analytics::AnalyticsEmitter;
use crate::detection::{
    DetectionSnapshot, DetectionStateMachine, MarkerTransition, SessionContext,
};
use crate::marker::{load_reference_images, MarkerCatalog, MarkerDescriptor};
use crate::playback::{PlaybackController, PlaybackFactory};
use crate::tracking::{SessionEnd, SessionHandle, TrackingError, TrackingSessionAdapter, TrackingSlots};

/// Starts scan sessions against one catalog and tracking provider.
pub struct Scanner {
    catalog: Arc<dyn MarkerCatalog>,
    adapter: TrackingSessionAdapter,
    playback: Arc<dyn PlaybackFactory>,
    analytics: AnalyticsEmitter,
}

impl Scanner {
    pub fn new(
        catalog: Arc<dyn MarkerCatalog>,
        adapter: TrackingSessionAdapter,
        playback: Arc<dyn PlaybackFactory>,
        analytics: AnalyticsEmitter,
    ) -> Self {
        Self {
            catalog,
            adapter,
            playback,
            analytics,
        }
    }

    pub fn adapter(&self) -> &TrackingSessionAdapter {
        &self.adapter
    }

    /// Load the catalog and start a tracking session.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Catalog`] if the catalog cannot be listed
    /// - [`TrackingError::SessionActive`] if a session is already live
    /// - [`TrackingError::Init`] if no marker has a usable image
    /// - [`TrackingError::Unsupported`] if the provider lacks image tracking
    pub async fn start(&self) -> Result<ScanSession, SessionError> {
        if self.adapter.is_session_active() {
            return Err(TrackingError::SessionActive.into());
        }

        let markers = self.catalog.list_markers().await?;
        if markers.is_empty() {
            return Err(TrackingError::Init("marker catalog is empty".to_string()).into());
        }

        let loaded = load_reference_images(self.catalog.as_ref(), markers).await;
        if loaded.is_empty() {
            return Err(TrackingError::Init("no valid images to track".to_string()).into());
        }
        for (marker, reason) in &loaded.skipped {
            warn!(marker_id = %marker.id, reason = %reason, "Marker excluded from session");
        }

        let skipped: Vec<MarkerDescriptor> =
            loaded.skipped.into_iter().map(|(marker, _)| marker).collect();
        let slots = TrackingSlots::new(loaded.descriptors)?;
        let session_id = SessionId::generate();

        let context = SessionContext::new(session_id.clone(), slots.clone());
        let playback = PlaybackController::from_factory(self.playback.as_ref(), &slots);
        let machine = DetectionStateMachine::new(context, playback, self.analytics.clone());
        let status = machine.status();
        let transitions = machine.transitions();

        let handle = self.adapter.start(&slots, loaded.images, machine).await?;

        info!(
            session_id = %session_id,
            markers = slots.len(),
            skipped = skipped.len(),
            "Scan session started"
        );

        Ok(ScanSession {
            session_id,
            slots,
            skipped,
            status,
            transitions,
            handle,
        })
    }
}

/// A live scan session.
///
/// Dropping it cancels tracking without waiting; call [`ScanSession::stop`]
/// to wait for teardown.
pub struct ScanSession {
    session_id: SessionId,
    slots: TrackingSlots,
    skipped: Vec<MarkerDescriptor>,
    status: watch::Receiver<DetectionSnapshot>,
    transitions: broadcast::Receiver<MarkerTransition>,
    handle: SessionHandle,
}

impl ScanSession {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Markers registered with the provider, in slot order.
    pub fn markers(&self) -> &TrackingSlots {
        &self.slots
    }

    /// Markers excluded because their image could not be prepared.
    pub fn skipped(&self) -> &[MarkerDescriptor] {
        &self.skipped
    }

    /// Receiver for detection snapshots.
    pub fn status(&self) -> watch::Receiver<DetectionSnapshot> {
        self.status.clone()
    }

    /// Receiver for crossings from now on.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<MarkerTransition> {
        self.transitions.resubscribe()
    }

    /// Number of markers currently detected.
    pub fn detected_count(&self) -> usize {
        self.status.borrow().detected_count
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Stop tracking and wait for teardown. Later calls return `None`.
    pub async fn stop(&mut self) -> Option<SessionEnd> {
        let end = self.handle.stop().await;
        if let Some(end) = &end {
            info!(session_id = %self.session_id, end = ?end, "Scan session stopped");
        }
        end
    }

    /// Wait for the session to end on its own.
    pub async fn wait(&mut self) -> Option<SessionEnd> {
        self.handle.join().await
    }
}
