//! # detention-ctl
//!
//! Operator CLI for the detention engine: dry-run the analyzer against a
//! scenario file, inspect or discard a file checkpoint, render the report a
//! checkpoint has accumulated, and validate configuration.

mod commands;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use detention_shared::config::CONFIG_PATH_ENV;
use detention_shared::{ConfigManager, DetentionConfig};

use commands::{
    handle_analyze_command, handle_checkpoint_command, handle_config_command,
    handle_report_command,
};

#[derive(Debug, Parser)]
#[command(name = "detention-ctl", version, about = "Detention charge adjudication tooling")]
#[command(styles = output::clap_styles())]
pub(crate) struct Cli {
    /// Configuration file (TOML); defaults and DETENTION__* overrides apply when omitted
    #[arg(long, short = 'c', global = true, env = CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Run the analyzer over every stop of a scenario file without touching any system
    Analyze {
        /// JSON file with `rules`, `order` and optional `timestamps`
        scenario: PathBuf,

        /// Print the analysis results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or remove a saved batch checkpoint
    #[command(subcommand)]
    Checkpoint(CheckpointCommands),

    /// Render the report accumulated in a checkpoint
    Report {
        #[command(flatten)]
        location: CheckpointLocation,

        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,

        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Subcommand)]
pub(crate) enum CheckpointCommands {
    /// Show progress recorded in the checkpoint
    Show {
        #[command(flatten)]
        location: CheckpointLocation,

        /// Print the raw checkpoint JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the checkpoint so the next run starts fresh
    Clear {
        #[command(flatten)]
        location: CheckpointLocation,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum ConfigCommands {
    /// Load and validate configuration, then print the effective values
    Validate,
}

/// Where a checkpoint lives; unset fields fall back to the `[checkpoint]` config section
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CheckpointLocation {
    /// Checkpoint directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Checkpoint key
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    Csv,
    Text,
}

pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<DetentionConfig> {
    let config = match path {
        Some(path) => ConfigManager::load_from_path(path)?,
        None => ConfigManager::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() {
    detention_shared::logging::init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Analyze { scenario, json } => {
            handle_analyze_command(&scenario, json, config_path).await
        }
        Commands::Checkpoint(cmd) => handle_checkpoint_command(cmd, config_path).await,
        Commands::Report {
            location,
            format,
            output,
        } => handle_report_command(&location, format, output.as_deref(), config_path).await,
        Commands::Config(cmd) => handle_config_command(cmd, config_path),
    };

    if let Err(e) = result {
        output::error(format!("{e:#}"));
        std::process::exit(1);
    }
}
