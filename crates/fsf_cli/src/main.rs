//! fsf follower
//!
//! Keeps a local copy of a file-service's files by replaying its event log.
//!
//! # Commands
//!
//! - `run` - Run sync passes on a fixed interval
//! - `sync` - Run a single sync pass
//! - `status` - Display ledger summary
//! - `ledger` - List ledger records

mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::OutputFormat;
use config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// File-service follower.
#[derive(Parser)]
#[command(name = "fsf-follower")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(
        global = true,
        short,
        long,
        env = "FSF_CONFIG",
        default_value = "fsf-follower.toml"
    )]
    config: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sync passes on a fixed interval until interrupted
    Run,

    /// Run a single sync pass
    Sync,

    /// Display ledger summary
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List ledger records
    Ledger {
        /// Only list events after this id
        #[arg(short, long, default_value = "0")]
        after: u64,

        /// Maximum number of records to list
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run => {
            let config = AppConfig::load(&cli.config)?;
            commands::run::run(&config)?;
        }
        Commands::Sync => {
            let config = AppConfig::load(&cli.config)?;
            commands::sync::run(&config)?;
        }
        Commands::Status { format } => {
            let config = AppConfig::load(&cli.config)?;
            commands::status::run(&config, format)?;
        }
        Commands::Ledger {
            after,
            limit,
            format,
        } => {
            let config = AppConfig::load(&cli.config)?;
            commands::ledger::run(&config, after, limit, format)?;
        }
        Commands::Version => {
            println!("fsf-follower v{}", env!("CARGO_PKG_VERSION"));
            println!("fsf sync engine v{}", fsf_sync_engine::VERSION);
        }
    }

    Ok(())
}
