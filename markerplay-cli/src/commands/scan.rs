//! Scan command - run a scan session against a recorded frame script.
//!
//! The script stands in for the device camera: each frame lists which
//! reference images the tracker reports. Videos are simulated and log their
//! play/pause commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use markerplay::analytics::AnalyticsEmitter;
use markerplay::config::ConfigFile;
use markerplay::detection::MarkerTransition;
use markerplay::playback::SimulatedPlaybackFactory;
use markerplay::session::Scanner;
use markerplay::tracking::{
    FrameScript, ScriptedTrackingProvider, SessionEnd, TrackingPolicy, TrackingSessionAdapter,
};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::common::{build_runtime, resolve_analytics, resolve_catalog, CatalogArgs, PolicyArg};
use crate::error::CliError;

/// Arguments for the scan command.
pub struct ScanArgs {
    pub script: PathBuf,
    pub catalog: CatalogArgs,
    pub policy: Option<PolicyArg>,
    pub interval_ms: Option<u64>,
    pub analytics_url: Option<String>,
    pub no_analytics: bool,
    pub hold_open: bool,
}

/// Run the scan command.
pub fn run(args: ScanArgs, config: &ConfigFile) -> Result<(), CliError> {
    let runtime = build_runtime()?;
    runtime.block_on(run_scan(args, config))
}

async fn run_scan(args: ScanArgs, config: &ConfigFile) -> Result<(), CliError> {
    let script = FrameScript::load(&args.script).await?;
    let policy = args
        .policy
        .map(TrackingPolicy::from)
        .unwrap_or(config.tracking.policy);
    let interval_ms = args.interval_ms.unwrap_or(config.tracking.frame_interval_ms);

    let catalog = resolve_catalog(&args.catalog, config)?;
    let sink = resolve_analytics(args.analytics_url, args.no_analytics, config)?;

    println!("markerplay scan v{}", markerplay::VERSION);
    println!("=====================");
    println!();
    println!("Script:   {} ({} frames)", args.script.display(), script.len());
    println!("Policy:   {}", policy);
    println!("Interval: {} ms", interval_ms);
    println!();

    let provider = ScriptedTrackingProvider::new(script)
        .with_frame_interval(Duration::from_millis(interval_ms))
        .hold_open(args.hold_open);

    let (emitter, dispatcher) = AnalyticsEmitter::spawn(sink);
    let scanner = Scanner::new(
        catalog,
        TrackingSessionAdapter::new(Arc::new(provider)).with_policy(policy),
        Arc::new(SimulatedPlaybackFactory),
        emitter,
    );

    // Set up signal handler for graceful shutdown
    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping scan...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let mut session = scanner.start().await?;
    println!(
        "Session {} tracking {} marker(s)",
        session.session_id(),
        session.markers().len()
    );
    for marker in session.skipped() {
        println!("  Skipped {} (image unusable)", marker.id);
    }
    if args.hold_open {
        println!("Press Ctrl+C to stop");
    }
    println!();

    let mut transitions = session.subscribe_transitions();
    let printer = tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(MarkerTransition::Detected { title, .. }) => {
                    println!("Marker detected: Found {}", title)
                }
                Ok(MarkerTransition::Lost { marker_id }) => println!("Marker lost: {}", marker_id),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Transition printer lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let finished = tokio::select! {
        end = session.wait() => end,
        _ = shutdown.cancelled() => None,
    };
    let end = match finished {
        Some(end) => Some(end),
        None => session.stop().await,
    };

    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Transition printer failed");
    }
    let stats = dispatcher.shutdown().await;

    println!();
    println!("Session ended: {}", describe_end(end.as_ref()));
    println!(
        "Analytics: {} delivered, {} failed",
        stats.delivered, stats.failed
    );

    match end {
        Some(SessionEnd::Failed(e)) => Err(e.into()),
        _ => Ok(()),
    }
}

fn describe_end(end: Option<&SessionEnd>) -> String {
    match end {
        Some(SessionEnd::Stopped) => "stopped".to_string(),
        Some(SessionEnd::ProviderEnded) => "frame script finished".to_string(),
        Some(SessionEnd::Failed(e)) => format!("failed ({})", e),
        None => "already stopped".to_string(),
    }
}
