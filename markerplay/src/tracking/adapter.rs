//! Tracking session adapter.
//!
//! Wraps an [`ImageTrackingProvider`] and turns its per-frame results into
//! normalized [`TrackingSample`]s for a single registered [`FrameConsumer`].
//!
//! # Frame loop
//!
//! ```text
//! ┌──────────────┐  next_frame()  ┌──────────────┐  on_frame(&[TrackingSample])
//! │   Provider   │ ─────────────► │  frame loop  │ ───────────────────────────► consumer
//! │   session    │ ◄───────────── │ (tokio task) │ ───────────────────────────► on_session_end
//! └──────────────┘     end()      └──────────────┘
//! ```
//!
//! The loop pulls one batch, hands it to the consumer, and only then asks the
//! provider for the next one, so batches never overlap. [`SessionHandle::stop`]
//! cancels the loop and waits for it to exit; once it returns, the consumer
//! has seen its last callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::TrackingError;
use super::policy::TrackingPolicy;
use super::provider::{FrameBatch, ImageTrackingProvider, Pose, ProviderSession, ReferenceImage};
use super::slots::TrackingSlots;

/// Normalized per-slot tracking sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSample {
    /// Provider slot index (may be out of range if the provider misbehaves).
    pub slot: usize,
    /// Whether the slot is confidently tracked under the active policy.
    pub tracked: bool,
    /// Pose, only present for tracked samples.
    pub pose: Option<Pose>,
    /// Presentation time of the frame the sample came from.
    pub timestamp: Instant,
}

impl TrackingSample {
    /// Sample without pose, stamped now.
    pub fn new(slot: usize, tracked: bool) -> Self {
        Self {
            slot,
            tracked,
            pose: None,
            timestamp: Instant::now(),
        }
    }
}

/// Why a tracking session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// `stop()` was called.
    Stopped,
    /// The provider closed the session on its own.
    ProviderEnded,
    /// The provider reported a fatal error.
    Failed(TrackingError),
}

impl SessionEnd {
    /// Whether the session ended without a `stop()` request.
    pub fn is_unrequested(&self) -> bool {
        !matches!(self, SessionEnd::Stopped)
    }
}

/// The single consumer of a session's frames.
///
/// Both callbacks run on the frame loop task, one at a time.
pub trait FrameConsumer: Send + 'static {
    /// Handle one frame's samples. Must not block.
    fn on_frame(&mut self, samples: &[TrackingSample]);

    /// Called exactly once after the last frame.
    fn on_session_end(&mut self, _end: &SessionEnd) {}
}

impl<F> FrameConsumer for F
where
    F: FnMut(&[TrackingSample]) + Send + 'static,
{
    fn on_frame(&mut self, samples: &[TrackingSample]) {
        self(samples)
    }
}

/// Normalize one provider frame.
///
/// Every provider entry produces one sample; slots the provider did not
/// mention produce nothing.
pub fn normalize_frame(batch: &FrameBatch, policy: TrackingPolicy) -> Vec<TrackingSample> {
    batch
        .results
        .iter()
        .map(|result| {
            let tracked = policy.is_tracked(result.state);
            TrackingSample {
                slot: result.index,
                tracked,
                pose: if tracked { result.pose } else { None },
                timestamp: batch.timestamp,
            }
        })
        .collect()
}

/// Releases the adapter's single-session slot when dropped.
struct ActiveGuard(Arc<AtomicBool>);

impl ActiveGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the provider and enforces one live session at a time.
pub struct TrackingSessionAdapter {
    provider: Arc<dyn ImageTrackingProvider>,
    policy: TrackingPolicy,
    active: Arc<AtomicBool>,
}

impl TrackingSessionAdapter {
    /// Create an adapter with the strict tracking policy.
    pub fn new(provider: Arc<dyn ImageTrackingProvider>) -> Self {
        Self {
            provider,
            policy: TrackingPolicy::default(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the tracking-state normalization policy.
    pub fn with_policy(mut self, policy: TrackingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TrackingPolicy {
        self.policy
    }

    /// Whether a session is currently live.
    pub fn is_session_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether the provider supports image tracking.
    pub async fn is_supported(&self) -> bool {
        self.provider.is_supported().await
    }

    /// Start a session and begin delivering frames to `consumer`.
    ///
    /// `images[i]` is the reference image of `slots.get(i)`.
    ///
    /// # Errors
    ///
    /// - [`TrackingError::SessionActive`] if a session is already live
    /// - [`TrackingError::Init`] if the images do not match the slots or are unusable
    /// - [`TrackingError::Unsupported`] if the provider lacks image tracking
    pub async fn start<C: FrameConsumer>(
        &self,
        slots: &TrackingSlots,
        images: Vec<ReferenceImage>,
        consumer: C,
    ) -> Result<SessionHandle, TrackingError> {
        let guard = ActiveGuard::acquire(&self.active).ok_or(TrackingError::SessionActive)?;

        if slots.is_empty() {
            return Err(TrackingError::Init("no markers to track".to_string()));
        }
        if images.len() != slots.len() {
            return Err(TrackingError::Init(format!(
                "{} reference images for {} markers",
                images.len(),
                slots.len()
            )));
        }
        for (slot, image) in images.iter().enumerate() {
            image
                .validate()
                .map_err(|reason| TrackingError::Init(format!("slot {}: {}", slot, reason)))?;
        }

        if !self.provider.is_supported().await {
            return Err(TrackingError::Unsupported);
        }

        let session = self.provider.request_session(images).await?;

        info!(
            markers = slots.len(),
            policy = %self.policy,
            "Tracking session started"
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_frame_loop(
            session,
            consumer,
            self.policy,
            cancel.clone(),
            guard,
        ));

        Ok(SessionHandle {
            cancel,
            task: Some(task),
        })
    }
}

async fn run_frame_loop<C: FrameConsumer>(
    mut session: Box<dyn ProviderSession>,
    mut consumer: C,
    policy: TrackingPolicy,
    cancel: CancellationToken,
    _guard: ActiveGuard,
) -> SessionEnd {
    let mut frames: u64 = 0;

    let end = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break SessionEnd::Stopped,

            frame = session.next_frame() => match frame {
                Some(Ok(batch)) => {
                    frames += 1;
                    let samples = normalize_frame(&batch, policy);
                    consumer.on_frame(&samples);
                }
                Some(Err(e)) => {
                    error!(error = %e, "Tracking session failed");
                    break SessionEnd::Failed(e);
                }
                None => {
                    debug!("Provider ended the tracking session");
                    break SessionEnd::ProviderEnded;
                }
            }
        }
    };

    session.end();
    consumer.on_session_end(&end);
    info!(frames, end = ?end, "Tracking session ended");
    end
}

/// Handle to a running tracking session.
///
/// Dropping the handle cancels the frame loop without waiting for it.
pub struct SessionHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<SessionEnd>>,
}

impl SessionHandle {
    /// Whether the frame loop is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the session and wait for the frame loop to exit.
    ///
    /// Returns how the session ended on the first call; later calls are
    /// no-ops returning `None`.
    pub async fn stop(&mut self) -> Option<SessionEnd> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the session to end on its own.
    pub async fn join(&mut self) -> Option<SessionEnd> {
        let task = self.task.as_mut()?;
        let result = task.await;
        self.task = None;

        Some(match result {
            Ok(end) => end,
            Err(e) => {
                warn!(error = %e, "Frame loop task did not complete");
                SessionEnd::Failed(TrackingError::Provider(format!("frame loop aborted: {}", e)))
            }
        })
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
