//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show`, `config init`, `config get` and
//! `config set` for viewing and modifying settings from the command line.

use std::path::Path;

use clap::Subcommand;
use markerplay::config::{ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show all configuration settings
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., catalog.url)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., catalog.url)
        key: String,

        /// Value to set (empty to clear)
        value: String,
    },
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(path),
        ConfigCommands::Show => run_show(path),
        ConfigCommands::Init { force } => run_init(path, force),
        ConfigCommands::Get { key } => run_get(path, &key),
        ConfigCommands::Set { key, value } => run_set(path, &key, &value),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'markerplay config show' to see available keys.",
            key
        ))
    })
}

fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }

    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load_from(path)?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = ConfigFile::load_from(path)?;
    config_key.set(&mut config, value)?;
    config.save_to(path)?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));

    Ok(())
}
