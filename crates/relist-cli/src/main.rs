//! Relist CLI - Command-line interface for the Relist backend
//!
//! Provides commands for:
//! - Storing credentials and pairing the browser extension
//! - Fetching the Poshmark inventory
//! - Publishing listings to Poshmark and eBay
//! - Managing marketplace connections
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod browser;
mod commands;
mod context;
mod output;
mod progress;

use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand,
    connect::ConnectCommand, inventory::InventoryCommand, publish::PublishCommand,
};
use context::AppContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "relist", version, about = "Crosslist your closet from the terminal")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authentication and extension pairing
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Marketplace inventory
    #[command(subcommand)]
    Inventory(InventoryCommand),
    /// Publish a listing to a marketplace
    Publish(PublishCommand),
    /// Marketplace connections
    #[command(subcommand)]
    Connect(ConnectCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// `RUST_LOG` wins, then `-v`, then `logging.level` from the config
fn env_filter(verbose: u8, configured: &str) -> EnvFilter {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions(cmd) = &cli.command {
        return cmd.execute();
    }

    let ctx = AppContext::load(cli.config.clone())?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose, &ctx.config.logging.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let result = match &cli.command {
        Commands::Auth(cmd) => cmd.execute(&ctx, format).await,
        Commands::Inventory(cmd) => cmd.execute(&ctx, format).await,
        Commands::Publish(cmd) => cmd.execute(&ctx, format).await,
        Commands::Connect(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
        Commands::Completions(_) => Ok(()),
    };

    if let Err(e) = &result {
        get_formatter(cli.json).error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
