//! Quill CLI - content sync engine.
//!
//! Provides commands for:
//! - `sync`: Sync a content directory into the store once
//! - `watch`: Sync, then keep syncing as the directory changes

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{SyncArgs, WatchArgs};
use error::CliError;
use output::Output;

/// Quill - content sync engine.
#[derive(Parser)]
#[command(name = "quill", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the content directory into the store.
    Sync(SyncArgs),
    /// Sync, then watch the content directory and re-sync on changes.
    Watch(WatchArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Sync(args) => args.common.verbose,
            Self::Watch(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli.command) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    match command {
        Commands::Sync(args) => rt.block_on(args.execute()),
        Commands::Watch(args) => rt.block_on(args.execute()),
    }
}
