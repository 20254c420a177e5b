//! One-shot sync command.

use super::{build_service, CommandResult};
use crate::config::AppConfig;
use fsf_sync_engine::TickOutcome;

/// Runs exactly one pass.
pub fn run(config: &AppConfig) -> CommandResult {
    let service = build_service(config)?;

    match service.sync_once() {
        TickOutcome::Completed(report) => {
            match report.recovered {
                Some(event_id) => println!("Recovered event {event_id}"),
                None => println!("No unacknowledged event"),
            }
            println!("Applied {} event(s)", report.applied);
            if let Some(event_id) = report.last_event_id {
                println!("Last event: {event_id}");
            }
            println!("Took {:?}", report.duration);
            Ok(())
        }
        TickOutcome::Failed(e) => Err(e.into()),
        TickOutcome::Skipped => {
            println!("Another pass holds the sync lock, nothing done");
            Ok(())
        }
    }
}
