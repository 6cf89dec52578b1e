//! markerplay CLI - Command-line interface
//!
//! Lists the marker catalog, runs scan sessions against recorded frame
//! scripts and manages the configuration file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use markerplay::config::{config_file_path, ConfigFile};
use markerplay::logging;

use commands::common::{CatalogArgs, PolicyArg};
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "markerplay", version, about = "Marker-triggered video playback")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List markers in the catalog
    Markers {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Fetch and decode every reference image
        #[arg(long)]
        verify: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a scan session against a recorded frame script
    Scan {
        /// Frame script (JSON)
        script: PathBuf,

        #[command(flatten)]
        catalog: CatalogArgs,

        /// Which tracking states count as tracked
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Milliseconds between scripted frames
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Analytics service base URL
        #[arg(long)]
        analytics_url: Option<String>,

        /// Log analytics events instead of sending them
        #[arg(long)]
        no_analytics: bool,

        /// Keep the session open after the script ends (stop with Ctrl+C)
        #[arg(long)]
        hold_open: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);

    // Config commands read and write the file themselves.
    let command = match cli.command {
        Commands::Config { command } => return commands::config::run(command, &config_path),
        other => other,
    };

    let mut config = ConfigFile::load_from(&config_path)?;
    if let Some(config_dir) = config_path.parent() {
        config.resolve_relative_to(config_dir);
    }
    let mut log_settings = config.logging.clone();
    if cli.verbose {
        log_settings.level = "debug".to_string();
    }
    let _log_guard = logging::init(&log_settings);
    tracing::debug!(config = %config_path.display(), "Loaded configuration");

    match command {
        Commands::Markers {
            catalog,
            verify,
            json,
        } => commands::markers::run(
            commands::markers::MarkersArgs {
                catalog,
                verify,
                json,
            },
            &config,
        ),
        Commands::Scan {
            script,
            catalog,
            policy,
            interval_ms,
            analytics_url,
            no_analytics,
            hold_open,
        } => commands::scan::run(
            commands::scan::ScanArgs {
                script,
                catalog,
                policy,
                interval_ms,
                analytics_url,
                no_analytics,
                hold_open,
            },
            &config,
        ),
        Commands::Config { .. } => Ok(()),
    }
}
