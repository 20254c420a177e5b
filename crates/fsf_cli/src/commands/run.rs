//! Scheduled sync command.

use super::{build_service, CommandResult, FollowerService};
use crate::config::AppConfig;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

/// Runs passes on a fixed interval until Ctrl-C.
pub fn run(config: &AppConfig) -> CommandResult {
    let service = Arc::new(build_service(config)?);
    let period = service.engine().config().sync_interval;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(schedule(service, period))
}

async fn schedule(service: Arc<FollowerService>, period: Duration) -> CommandResult {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut shutdown = pin!(signal::ctrl_c());

    info!(interval_ms = period.as_millis() as u64, "follower started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let service = Arc::clone(&service);
                if let Err(e) = tokio::task::spawn_blocking(move || service.sync_once()).await {
                    error!(error = %e, "sync task panicked");
                }
            }
            result = &mut shutdown => {
                result?;
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
