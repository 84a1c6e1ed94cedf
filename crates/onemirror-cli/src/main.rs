//! onemirror CLI - Command-line interface for onemirror
//!
//! Provides commands for:
//! - Watching a drive and printing the classified action stream
//! - Showing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use onemirror_core::config::Config;

mod commands;
mod output;

use commands::{config::ConfigCommand, watch::WatchCommand, CommandContext};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "onemirror",
    version,
    about = "Reconcile OneDrive change feeds into mirror actions"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, env = "ONEMIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Follow the drive and print every classified change
    Watch(WatchCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Picks the log filter: `-v` flags first, then `--quiet`, then the config
fn log_level(verbose: u8, quiet: bool, configured: &str) -> &str {
    match verbose {
        0 if quiet => "error",
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let configured = Config::load_or_default(&config_path).logging.level;

    // Setup tracing
    let filter = log_level(cli.verbose, cli.quiet, &configured);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext {
        format: OutputFormat::from_flag(cli.json),
        quiet: cli.quiet,
        config_path,
    };

    match cli.command {
        Commands::Watch(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
