//! Integration tests for scan sessions.
//!
//! These tests drive the complete flow:
//! - file catalog → reference images → tracking slots
//! - channel provider frames → detection state machine
//! - playback commands and analytics events
//!
//! Run with: `cargo test --test scan_session_integration`

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use image::RgbaImage;
use parking_lot::Mutex;
use tokio::sync::watch;

use markerplay::analytics::{
    AnalyticsDeliveryError, AnalyticsDispatcher, AnalyticsEmitter, AnalyticsEvent, AnalyticsSink,
    EventType,
};
use markerplay::detection::{DetectionSnapshot, MarkerTransition};
use markerplay::marker::{FileMarkerCatalog, MarkerDescriptor, MarkerId};
use markerplay::playback::{PlaybackError, PlaybackFactory, PlaybackHandle};
use markerplay::session::{ScanSession, Scanner, SessionError};
use markerplay::tracking::{
    ChannelTrackingProvider, FrameScript, FrameSender, RawTrackingResult, ScriptedTrackingProvider,
    SessionEnd, TrackingError, TrackingPolicy, TrackingSessionAdapter, TrackingState,
};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play(String),
    Pause(String),
    Release(String),
}

#[derive(Default)]
struct RecordingFactory {
    log: Arc<Mutex<Vec<Command>>>,
}

struct RecordingHandle {
    id: String,
    log: Arc<Mutex<Vec<Command>>>,
}

impl PlaybackHandle for RecordingHandle {
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.log.lock().push(Command::Play(self.id.clone()));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.log.lock().push(Command::Pause(self.id.clone()));
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().push(Command::Release(self.id.clone()));
    }
}

impl PlaybackFactory for RecordingFactory {
    fn create(&self, marker: &MarkerDescriptor) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        Ok(Box::new(RecordingHandle {
            id: marker.id.as_str().to_string(),
            log: Arc::clone(&self.log),
        }))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AnalyticsEvent>>,
    fail_all: bool,
}

impl AnalyticsSink for RecordingSink {
    fn record<'a>(
        &'a self,
        event: &'a AnalyticsEvent,
    ) -> BoxFuture<'a, Result<(), AnalyticsDeliveryError>> {
        Box::pin(async move {
            if self.fail_all {
                return Err(AnalyticsDeliveryError::Status(503));
            }
            self.events.lock().push(event.clone());
            Ok(())
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

fn png_bytes() -> Vec<u8> {
    let bitmap = RgbaImage::from_pixel(8, 8, image::Rgba([0, 128, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    bitmap
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Write a catalog with one marker per id. Ids listed in `broken` get an
/// image that does not decode.
fn write_catalog(dir: &Path, ids: &[&str], broken: &[&str]) -> PathBuf {
    let images = dir.join("images");
    std::fs::create_dir_all(&images).unwrap();

    let mut records = Vec::new();
    for id in ids {
        let file = images.join(format!("{}.png", id));
        if broken.contains(id) {
            std::fs::write(&file, b"not an image").unwrap();
        } else {
            std::fs::write(&file, png_bytes()).unwrap();
        }
        records.push(serde_json::json!({
            "id": id,
            "title": format!("Poster {}", id),
            "marker_image_url": format!("images/{}.png", id),
            "video_url": format!("videos/{}.mp4", id),
            "physical_width": 0.2,
        }));
    }

    let path = dir.join("catalog.json");
    std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();
    path
}

struct Fixture {
    _dir: tempfile::TempDir,
    scanner: Scanner,
    frames: FrameSender,
    commands: Arc<Mutex<Vec<Command>>>,
    sink: Arc<RecordingSink>,
    dispatcher: AnalyticsDispatcher,
}

impl Fixture {
    fn new(ids: &[&str]) -> Self {
        Self::build(ids, &[], RecordingSink::default())
    }

    fn build(ids: &[&str], broken: &[&str], sink: RecordingSink) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = write_catalog(dir.path(), ids, broken);

        let (provider, frames) = ChannelTrackingProvider::new();
        let factory = RecordingFactory::default();
        let commands = Arc::clone(&factory.log);
        let sink = Arc::new(sink);
        let (emitter, dispatcher) = AnalyticsEmitter::spawn(sink.clone());

        let scanner = Scanner::new(
            Arc::new(FileMarkerCatalog::new(catalog_path)),
            TrackingSessionAdapter::new(Arc::new(provider)),
            Arc::new(factory),
            emitter,
        );

        Self {
            _dir: dir,
            scanner,
            frames,
            commands,
            sink,
            dispatcher,
        }
    }

    fn send(&self, results: &[(usize, TrackingState)]) {
        self.frames
            .send(
                results
                    .iter()
                    .map(|(index, state)| RawTrackingResult::new(*index, *state))
                    .collect(),
            )
            .unwrap();
    }

    fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    /// Shut analytics down and return `(marker, event type)` pairs.
    async fn finish(self) -> Vec<(String, EventType)> {
        let Fixture {
            sink, dispatcher, ..
        } = self;
        dispatcher.shutdown().await;
        let events: Vec<_> = sink
            .events
            .lock()
            .iter()
            .map(|e| (e.marker_id.as_str().to_string(), e.event_type))
            .collect();
        events
    }
}

async fn wait_for_detected(status: &mut watch::Receiver<DetectionSnapshot>, count: usize) {
    tokio::time::timeout(WAIT, status.wait_for(|s| s.detected_count == count))
        .await
        .expect("timed out waiting for detection snapshot")
        .expect("state machine dropped");
}

fn events_for(events: &[(String, EventType)], marker: &str) -> Vec<EventType> {
    events
        .iter()
        .filter(|(m, _)| m == marker)
        .map(|(_, e)| *e)
        .collect()
}

async fn start(fixture: &Fixture) -> ScanSession {
    fixture.scanner.start().await.expect("session should start")
}

// ============================================================================
// Crossing scenarios
// ============================================================================

#[tokio::test]
async fn test_single_marker_found_repeated_and_lost() {
    let fixture = Fixture::new(&["m1"]);
    let mut session = start(&fixture).await;
    let mut status = session.status();

    assert_eq!(session.markers().len(), 1);
    assert_eq!(status.borrow().marker_count, 1);
    assert_eq!(session.detected_count(), 0);

    // Frame 1: not tracked. Frame 2: tracked.
    fixture.send(&[(0, TrackingState::Limited)]);
    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;
    assert_eq!(session.detected_count(), 1);

    // Frame 3: still tracked, no new crossing. Frame 4: lost.
    fixture.send(&[(0, TrackingState::Tracked)]);
    fixture.send(&[(0, TrackingState::Emulated)]);
    wait_for_detected(&mut status, 0).await;

    assert_eq!(session.stop().await, Some(SessionEnd::Stopped));
    assert_eq!(
        fixture.commands(),
        vec![
            Command::Play("m1".into()),
            Command::Pause("m1".into()),
            Command::Release("m1".into()),
        ]
    );

    let events = fixture.finish().await;
    assert_eq!(
        events_for(&events, "m1"),
        vec![EventType::Scan, EventType::Play, EventType::Pause]
    );
}

#[tokio::test]
async fn test_two_markers_in_one_frame() {
    let fixture = Fixture::new(&["m1", "m2"]);
    let mut session = start(&fixture).await;
    let mut status = session.status();
    let mut transitions = session.subscribe_transitions();

    fixture.send(&[(0, TrackingState::Tracked), (1, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 2).await;

    let snapshot = status.borrow().clone();
    let titles: Vec<_> = snapshot.detected.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Poster m1", "Poster m2"]);

    let first = transitions.recv().await.unwrap();
    let second = transitions.recv().await.unwrap();
    assert_eq!(first.marker_id(), &MarkerId::new("m1"));
    assert_eq!(second.marker_id(), &MarkerId::new("m2"));
    assert!(matches!(first, MarkerTransition::Detected { .. }));

    session.stop().await;
    let events = fixture.finish().await;
    for marker in ["m1", "m2"] {
        assert_eq!(
            events_for(&events, marker),
            vec![EventType::Scan, EventType::Play]
        );
    }
}

#[tokio::test]
async fn test_stop_pauses_detected_without_pause_event() {
    let fixture = Fixture::new(&["m1"]);
    let mut session = start(&fixture).await;
    let mut status = session.status();

    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;

    assert_eq!(session.stop().await, Some(SessionEnd::Stopped));
    assert_eq!(session.stop().await, None);
    assert!(!session.is_running());

    let final_snapshot = status.borrow().clone();
    assert!(!final_snapshot.active);
    assert_eq!(final_snapshot.detected_count, 0);

    // The provider session is gone; frames can no longer be delivered.
    assert!(fixture
        .frames
        .send(vec![RawTrackingResult::new(0, TrackingState::Tracked)])
        .is_err());

    assert_eq!(
        fixture.commands(),
        vec![
            Command::Play("m1".into()),
            Command::Pause("m1".into()),
            Command::Release("m1".into()),
        ]
    );
    let events = fixture.finish().await;
    assert_eq!(
        events_for(&events, "m1"),
        vec![EventType::Scan, EventType::Play]
    );
}

#[tokio::test]
async fn test_out_of_range_slot_ignored() {
    let fixture = Fixture::new(&["m1"]);
    let mut session = start(&fixture).await;
    let mut status = session.status();

    fixture.send(&[(3, TrackingState::Tracked)]);
    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;

    let detected: Vec<_> = status.borrow().detected.iter().map(|m| m.id.clone()).collect();
    assert_eq!(detected, vec![MarkerId::new("m1")]);

    session.stop().await;
    let events = fixture.finish().await;
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_analytics_failures_do_not_affect_detection() {
    let fixture = Fixture::build(
        &["m1"],
        &[],
        RecordingSink {
            fail_all: true,
            ..Default::default()
        },
    );
    let mut session = start(&fixture).await;
    let mut status = session.status();

    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;
    fixture.send(&[(0, TrackingState::Limited)]);
    wait_for_detected(&mut status, 0).await;
    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;

    session.stop().await;
    let plays = fixture
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::Play(_)))
        .count();
    assert_eq!(plays, 2);
    assert!(fixture.finish().await.is_empty());
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_second_start_rejected_while_live() {
    let fixture = Fixture::new(&["m1"]);
    let mut session = start(&fixture).await;

    let second = fixture.scanner.start().await;
    assert!(matches!(
        second,
        Err(SessionError::Tracking(TrackingError::SessionActive))
    ));
    assert!(session.is_running());

    session.stop().await;
    assert!(!fixture.scanner.adapter().is_session_active());
}

#[tokio::test]
async fn test_broken_image_excluded_before_slot_assignment() {
    let fixture = Fixture::build(&["m1", "m2"], &["m1"], RecordingSink::default());
    let mut session = start(&fixture).await;
    let mut status = session.status();

    assert_eq!(session.markers().len(), 1);
    assert_eq!(session.skipped().len(), 1);
    assert_eq!(session.skipped()[0].id, MarkerId::new("m1"));

    // Slot 0 is now m2.
    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;
    assert_eq!(status.borrow().detected[0].id, MarkerId::new("m2"));

    session.stop().await;
    let events = fixture.finish().await;
    assert!(events_for(&events, "m1").is_empty());
    assert_eq!(
        events_for(&events, "m2"),
        vec![EventType::Scan, EventType::Play]
    );
}

#[tokio::test]
async fn test_no_valid_images_fails_start() {
    let fixture = Fixture::build(&["m1", "m2"], &["m1", "m2"], RecordingSink::default());

    let result = fixture.scanner.start().await;
    match result {
        Err(SessionError::Tracking(TrackingError::Init(reason))) => {
            assert_eq!(reason, "no valid images to track")
        }
        other => panic!("expected init error, got {:?}", other.map(|_| ())),
    }
    assert!(!fixture.scanner.adapter().is_session_active());
}

#[tokio::test]
async fn test_provider_failure_tears_down() {
    let fixture = Fixture::new(&["m1"]);
    let mut session = start(&fixture).await;
    let mut status = session.status();

    fixture.send(&[(0, TrackingState::Tracked)]);
    wait_for_detected(&mut status, 1).await;

    fixture
        .frames
        .fail(TrackingError::Provider("camera disconnected".into()))
        .unwrap();

    let end = tokio::time::timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(
        end,
        Some(SessionEnd::Failed(TrackingError::Provider(
            "camera disconnected".into()
        )))
    );
    assert!(!status.borrow().active);
    assert!(fixture.commands().contains(&Command::Pause("m1".into())));

    let events = fixture.finish().await;
    assert_eq!(
        events_for(&events, "m1"),
        vec![EventType::Scan, EventType::Play]
    );
}

#[tokio::test]
async fn test_provider_end_is_reported() {
    let Fixture {
        _dir,
        scanner,
        frames,
        ..
    } = Fixture::new(&["m1"]);
    let mut session = scanner.start().await.unwrap();

    drop(frames);
    let end = tokio::time::timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(end, Some(SessionEnd::ProviderEnded));
    assert!(!scanner.adapter().is_session_active());
}

#[tokio::test]
async fn test_unsupported_provider() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = write_catalog(dir.path(), &["m1"], &[]);
    let (provider, _frames) = ChannelTrackingProvider::new();
    let (emitter, _dispatcher) = AnalyticsEmitter::spawn(Arc::new(RecordingSink::default()));

    let scanner = Scanner::new(
        Arc::new(FileMarkerCatalog::new(catalog_path)),
        TrackingSessionAdapter::new(Arc::new(provider.unsupported())),
        Arc::new(RecordingFactory::default()),
        emitter,
    );

    assert!(matches!(
        scanner.start().await,
        Err(SessionError::Tracking(TrackingError::Unsupported))
    ));
}

#[tokio::test]
async fn test_missing_catalog_file() {
    let (provider, _frames) = ChannelTrackingProvider::new();
    let (emitter, _dispatcher) = AnalyticsEmitter::spawn(Arc::new(RecordingSink::default()));
    let scanner = Scanner::new(
        Arc::new(FileMarkerCatalog::new("/nonexistent/catalog.json")),
        TrackingSessionAdapter::new(Arc::new(provider)),
        Arc::new(RecordingFactory::default()),
        emitter,
    );

    assert!(matches!(
        scanner.start().await,
        Err(SessionError::Catalog(_))
    ));
}

// ============================================================================
// Scripted provider
// ============================================================================

#[tokio::test]
async fn test_scripted_session_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = write_catalog(dir.path(), &["m1", "m2"], &[]);

    let script = FrameScript::from_json(
        r#"{ "frames": [
            { "results": [ { "index": 0, "state": "limited" } ] },
            { "results": [ { "index": 0, "state": "tracked" } ] },
            { "results": [ { "index": 0, "state": "tracked" }, { "index": 1, "state": "limited" } ] },
            { "results": [ { "index": 0, "state": "emulated" }, { "index": 1, "state": "tracked" } ] }
        ] }"#,
    )
    .unwrap();
    let provider = ScriptedTrackingProvider::new(script).with_frame_interval(Duration::ZERO);

    let factory = RecordingFactory::default();
    let commands = Arc::clone(&factory.log);
    let sink = Arc::new(RecordingSink::default());
    let (emitter, dispatcher) = AnalyticsEmitter::spawn(sink.clone());

    let scanner = Scanner::new(
        Arc::new(FileMarkerCatalog::new(catalog_path)),
        TrackingSessionAdapter::new(Arc::new(provider)).with_policy(TrackingPolicy::AcceptLimited),
        Arc::new(factory),
        emitter,
    );

    let mut session = scanner.start().await.unwrap();
    let end = tokio::time::timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(end, Some(SessionEnd::ProviderEnded));

    // Under AcceptLimited: m1 found on frame 1, lost on frame 4; m2 found on
    // frame 3 and paused by teardown.
    let log = commands.lock().clone();
    let plays: Vec<_> = log
        .iter()
        .filter_map(|c| match c {
            Command::Play(id) => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(plays, vec!["m1", "m2"]);

    dispatcher.shutdown().await;
    let events: Vec<_> = sink
        .events
        .lock()
        .iter()
        .map(|e| (e.marker_id.as_str().to_string(), e.event_type))
        .collect();
    assert_eq!(
        events_for(&events, "m1"),
        vec![EventType::Scan, EventType::Play, EventType::Pause]
    );
    assert_eq!(
        events_for(&events, "m2"),
        vec![EventType::Scan, EventType::Play]
    );
}
