//! Logging setup.
//!
//! Installs a `tracing` subscriber with a stderr layer and, when a log
//! directory is configured, a daily-rotated file layer. `RUST_LOG` overrides
//! the configured level.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// File name prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "markerplay.log";

/// Keeps the file writer alive. Hold it until the process exits, or buffered
/// lines are lost.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Build the level filter: `RUST_LOG` if set, else the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. A second call leaves the first subscriber
/// in place.
pub fn init(settings: &LoggingSettings) -> LoggingGuard {
    let (file_layer, file_guard, file_error) = match settings.directory.as_deref() {
        Some(dir) => match file_writer(dir) {
            Ok((writer, guard)) => (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
                None,
            ),
            Err(e) => (None, None, Some((dir.to_path_buf(), e))),
        },
        None => (None, None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter(&settings.level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .is_ok();

    if let Some((dir, e)) = file_error {
        tracing::warn!(directory = %dir.display(), error = %e, "File logging disabled");
    }
    if installed {
        tracing::debug!(level = %settings.level, "Logging initialized");
    }

    LoggingGuard { _file: file_guard }
}

fn file_writer(
    dir: &Path,
) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}
