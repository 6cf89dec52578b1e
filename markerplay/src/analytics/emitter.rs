//! Fire-and-forget analytics emission.
//!
//! [`AnalyticsEmitter::emit`] only enqueues; a single background
//! [`AnalyticsDispatcher`] task drains the queue and hands each event to the
//! sink in order. Delivery is attempted at most once per event.
//!
//! ```text
//! state machine ──emit()──► unbounded queue ──► dispatcher task ──record()──► sink
//!   (frame loop)              (never blocks)      (sequential)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::event::AnalyticsEvent;
use super::sink::{AnalyticsDeliveryError, AnalyticsSink};

/// Delivery counters reported when the dispatcher shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Cheap, cloneable handle for emitting analytics events.
#[derive(Debug, Clone)]
pub struct AnalyticsEmitter {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl AnalyticsEmitter {
    /// Start a dispatcher delivering to `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(sink: Arc<dyn AnalyticsSink>) -> (Self, AnalyticsDispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_dispatcher(sink, rx, shutdown.clone()));

        (Self { tx }, AnalyticsDispatcher { shutdown, task })
    }

    /// Emitter feeding an existing channel, for callers that consume events
    /// themselves.
    pub fn from_sender(tx: mpsc::UnboundedSender<AnalyticsEvent>) -> Self {
        Self { tx }
    }

    /// Queue an event for delivery. Never blocks and never fails; an event
    /// emitted after the dispatcher stopped is logged and dropped.
    pub fn emit(&self, event: AnalyticsEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            warn!(
                marker_id = %event.marker_id,
                event_type = %event.event_type,
                error = %AnalyticsDeliveryError::Closed,
                "Analytics event dropped"
            );
        }
    }
}

/// Handle to the background dispatcher task.
pub struct AnalyticsDispatcher {
    shutdown: CancellationToken,
    task: JoinHandle<DispatchStats>,
}

impl AnalyticsDispatcher {
    /// Deliver everything already queued, then stop.
    pub async fn shutdown(self) -> DispatchStats {
        self.shutdown.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Analytics dispatcher task failed");
                DispatchStats::default()
            }
        }
    }
}

async fn run_dispatcher(
    sink: Arc<dyn AnalyticsSink>,
    mut rx: mpsc::UnboundedReceiver<AnalyticsEvent>,
    shutdown: CancellationToken,
) -> DispatchStats {
    let mut stats = DispatchStats::default();

    loop {
        tokio::select! {
            biased;

            event = rx.recv() => match event {
                Some(event) => deliver(sink.as_ref(), &event, &mut stats).await,
                None => break,
            },

            _ = shutdown.cancelled() => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    deliver(sink.as_ref(), &event, &mut stats).await;
                }
                break;
            }
        }
    }

    debug!(
        delivered = stats.delivered,
        failed = stats.failed,
        "Analytics dispatcher stopped"
    );
    stats
}

async fn deliver(sink: &dyn AnalyticsSink, event: &AnalyticsEvent, stats: &mut DispatchStats) {
    match sink.record(event).await {
        Ok(()) => stats.delivered += 1,
        Err(e) => {
            stats.failed += 1;
            warn!(
                marker_id = %event.marker_id,
                event_type = %event.event_type,
                session_id = %event.session_id,
                error = %e,
                "Analytics delivery failed"
            );
        }
    }
}
