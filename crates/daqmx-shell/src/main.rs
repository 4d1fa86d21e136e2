//! CLI entry point for the DAQmx channel shell.
//!
//! Reads channel commands from a script file or interactively and prints the
//! replies.
//!
//! # Usage
//!
//! Run a script:
//! ```bash
//! daqmx-shell run rig.daqmx
//! ```
//!
//! Interactive session against the in-memory driver:
//! ```bash
//! daqmx-shell --mock repl
//! ```

mod logging;
mod script;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daq_driver_daqmx::mock::MockDriver;
use daq_driver_daqmx::{ChannelHost, DaqmxConfig, DaqmxDriver};
use tracing::info;

#[derive(Parser)]
#[command(name = "daqmx-shell")]
#[command(about = "Command shell for NI-DAQmx channels", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory driver instead of NI-DAQmx
    #[arg(long, global = true)]
    mock: bool,

    /// Log level, overrides the configuration file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json), overrides the configuration file
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute every line of a command script
    Run {
        /// Path to the script file
        script: PathBuf,
    },

    /// Read commands from stdin
    Repl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    logging::init(&config.logging)?;

    let mut host = ChannelHost::new(driver(cli.mock), config);
    let stdout = io::stdout();

    match cli.command {
        Commands::Run { script } => {
            let file = File::open(&script)
                .with_context(|| format!("Failed to open script {}", script.display()))?;
            let executed = script::run(&mut host, BufReader::new(file), stdout.lock(), false)?;
            info!(script = %script.display(), executed, "Script finished");
        }
        Commands::Repl => {
            script::run(&mut host, io::stdin().lock(), stdout.lock(), true)?;
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<DaqmxConfig> {
    let mut config = match &cli.config {
        Some(path) => DaqmxConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => DaqmxConfig::load().context("Failed to load configuration")?,
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "hardware")]
fn driver(mock: bool) -> Arc<dyn DaqmxDriver> {
    if mock {
        return Arc::new(MockDriver::new());
    }
    Arc::new(daq_driver_daqmx::NiDaqmx::new())
}

#[cfg(not(feature = "hardware"))]
fn driver(_mock: bool) -> Arc<dyn DaqmxDriver> {
    info!("Built without hardware support, using the in-memory driver");
    Arc::new(MockDriver::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "daqmx-shell",
            "run",
            "rig.daqmx",
            "--mock",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert!(cli.mock);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Run { script } => assert_eq!(script, PathBuf::from("rig.daqmx")),
            Commands::Repl => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["daqmx-shell"]).is_err());
    }

    #[test]
    fn test_cli_overrides_are_validated() {
        let cli =
            Cli::try_parse_from(["daqmx-shell", "--log-format", "xml", "repl"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_cli_level_override_ignores_case() {
        let cli =
            Cli::try_parse_from(["daqmx-shell", "--log-level", "DEBUG", "repl"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.logging.level, "DEBUG");
        assert!(logging::init(&config.logging).is_ok());
    }

    #[test]
    fn test_cli_verifies_command_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
