//! CLI command implementations.

pub mod ledger;
pub mod run;
pub mod status;
pub mod sync;

use crate::config::AppConfig;
use fsf_ledger::SqliteLedger;
use fsf_sync_engine::{HttpGateway, SyncService, UreqClient};
use std::error::Error;

/// Result type of command implementations.
pub type CommandResult<T = ()> = Result<T, Box<dyn Error>>;

/// Sync service wired to the HTTP gateway and the SQLite ledger.
pub type FollowerService = SyncService<HttpGateway<UreqClient>, SqliteLedger>;

/// Opens the ledger named by the configuration.
pub fn open_ledger(config: &AppConfig) -> CommandResult<SqliteLedger> {
    Ok(SqliteLedger::open(&config.ledger_path(), config.instance())?)
}

/// Builds the sync service from the configuration.
///
/// Configuration errors surface here, before any request is sent.
pub fn build_service(config: &AppConfig) -> CommandResult<FollowerService> {
    let sync_config = config.sync_config()?;
    let gateway = HttpGateway::connect(&config.gateway_config()?)?;
    let ledger = open_ledger(config)?;
    Ok(SyncService::from_config(sync_config, gateway, ledger)?)
}

/// Output format of the inspection commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}
