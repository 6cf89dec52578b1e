//! Channel-fed tracking provider.
//!
//! Frames are pushed by the caller through a [`FrameSender`], one batch per
//! send. Used to bridge an external tracking runtime that pushes results from
//! its own thread, and to drive sessions step by step in tests.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::error::TrackingError;
use super::provider::{
    FrameBatch, ImageTrackingProvider, ProviderSession, RawTrackingResult, ReferenceImage,
};

type FrameMessage = Result<FrameBatch, TrackingError>;

/// Producer side of a [`ChannelTrackingProvider`].
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<FrameMessage>,
}

impl FrameSender {
    /// Deliver one frame stamped with the current time.
    pub fn send(&self, results: Vec<RawTrackingResult>) -> Result<(), TrackingError> {
        self.send_batch(FrameBatch::now(results))
    }

    /// Deliver a pre-built frame.
    pub fn send_batch(&self, batch: FrameBatch) -> Result<(), TrackingError> {
        self.tx
            .send(Ok(batch))
            .map_err(|_| TrackingError::Provider("tracking session is closed".to_string()))
    }

    /// Report a fatal tracking failure.
    pub fn fail(&self, error: TrackingError) -> Result<(), TrackingError> {
        self.tx
            .send(Err(error))
            .map_err(|_| TrackingError::Provider("tracking session is closed".to_string()))
    }
}

/// Provider whose single session reads frames from a channel.
///
/// Dropping every [`FrameSender`] ends the session from the provider side.
pub struct ChannelTrackingProvider {
    rx: Mutex<Option<mpsc::UnboundedReceiver<FrameMessage>>>,
    supported: bool,
}

impl ChannelTrackingProvider {
    /// Create a provider and the sender feeding it.
    pub fn new() -> (Self, FrameSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
                supported: true,
            },
            FrameSender { tx },
        )
    }

    /// Make the provider report that image tracking is unsupported.
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }
}

impl ImageTrackingProvider for ChannelTrackingProvider {
    fn is_supported(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.supported })
    }

    fn request_session(
        &self,
        images: Vec<ReferenceImage>,
    ) -> BoxFuture<'_, Result<Box<dyn ProviderSession>, TrackingError>> {
        Box::pin(async move {
            for image in &images {
                image.validate().map_err(TrackingError::Init)?;
            }
            let rx = self.rx.lock().take().ok_or_else(|| {
                TrackingError::Init("channel provider supports a single session".to_string())
            })?;
            Ok(Box::new(ChannelSession { rx: Some(rx) }) as Box<dyn ProviderSession>)
        })
    }
}

struct ChannelSession {
    rx: Option<mpsc::UnboundedReceiver<FrameMessage>>,
}

impl ProviderSession for ChannelSession {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<FrameBatch, TrackingError>>> {
        Box::pin(async move {
            match self.rx.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            }
        })
    }

    fn end(&mut self) {
        self.rx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingState;

    fn image() -> ReferenceImage {
        ReferenceImage::new(image::RgbaImage::new(2, 2), 0.2)
    }

    #[tokio::test]
    async fn test_frames_flow_through() {
        let (provider, sender) = ChannelTrackingProvider::new();
        let mut session = provider.request_session(vec![image()]).await.unwrap();

        sender
            .send(vec![RawTrackingResult::new(0, TrackingState::Tracked)])
            .unwrap();
        let batch = session.next_frame().await.unwrap().unwrap();
        assert_eq!(batch.results.len(), 1);

        sender.fail(TrackingError::Provider("camera lost".into())).unwrap();
        assert!(session.next_frame().await.unwrap().is_err());

        drop(sender);
        assert!(session.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_end_closes_session() {
        let (provider, sender) = ChannelTrackingProvider::new();
        let mut session = provider.request_session(vec![image()]).await.unwrap();

        session.end();
        session.end();
        assert!(session.next_frame().await.is_none());
        assert!(sender.send(Vec::new()).is_err());
    }

    #[tokio::test]
    async fn test_single_session_only() {
        let (provider, _sender) = ChannelTrackingProvider::new();
        let _first = provider.request_session(vec![image()]).await.unwrap();
        let second = provider.request_session(vec![image()]).await;
        assert!(matches!(second, Err(TrackingError::Init(_))));
    }
}
