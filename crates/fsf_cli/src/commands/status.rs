//! Status command implementation.

use super::{open_ledger, CommandResult, OutputFormat};
use crate::config::AppConfig;
use fsf_ledger::{EventLedger, LedgerRecord, LedgerResult, StatusCounts};
use serde::Serialize;

/// Ledger summary.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Ledger database path.
    pub ledger: String,
    /// Largest recorded event id (0 when empty).
    pub last_event_id: u64,
    /// Records per status.
    pub counts: StatusCounts,
    /// Records awaiting apply and ack.
    pub pending: Vec<LedgerRecord>,
}

impl StatusReport {
    /// Collects the summary of a ledger.
    ///
    /// Up to two pending records are listed so a corrupted ledger shows up.
    pub fn collect(ledger: &impl EventLedger, name: String) -> LedgerResult<Self> {
        Ok(Self {
            ledger: name,
            last_event_id: ledger.last_event_id()?,
            counts: ledger.count_by_status()?,
            pending: ledger.pending_records(2)?,
        })
    }
}

/// Runs the status command.
pub fn run(config: &AppConfig, format: OutputFormat) -> CommandResult {
    let ledger = open_ledger(config)?;
    let report = StatusReport::collect(&ledger, config.ledger_path().display().to_string())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &StatusReport) {
    println!("Ledger: {}", report.ledger);
    println!("Last event id: {}", report.last_event_id);
    println!(
        "Records: {} ({} acked, {} fetched)",
        report.counts.total(),
        report.counts.acked,
        report.counts.fetched
    );
    match report.pending.as_slice() {
        [] => println!("Pending: none"),
        [record] => println!(
            "Pending: event {} {} {} (fetched {})",
            record.event_id, record.event_type, record.file_key, record.fetch_time
        ),
        records => {
            println!("WARNING: {} records are pending, expected at most one", records.len());
            for record in records {
                println!("  event {} {} {}", record.event_id, record.event_type, record.file_key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsf_ledger::SqliteLedger;
    use fsf_protocol::Event;

    #[test]
    fn collect_empty_ledger() {
        let ledger = SqliteLedger::open_in_memory("test").unwrap();
        let report = StatusReport::collect(&ledger, "mem".into()).unwrap();
        assert_eq!(report.last_event_id, 0);
        assert_eq!(report.counts.total(), 0);
        assert!(report.pending.is_empty());
    }

    #[test]
    fn collect_with_pending_record() {
        let ledger = SqliteLedger::open_in_memory("test").unwrap();
        ledger.save_fetched(&Event::added(1, "a")).unwrap();
        let record = ledger.find_by_event_id(1).unwrap().unwrap();
        ledger.mark_acked(record.id).unwrap();
        ledger.save_fetched(&Event::added(2, "b")).unwrap();

        let report = StatusReport::collect(&ledger, "mem".into()).unwrap();
        assert_eq!(report.last_event_id, 2);
        assert_eq!(report.counts.acked, 1);
        assert_eq!(report.counts.fetched, 1);
        assert_eq!(report.pending[0].file_key, "b");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pending"][0]["sync_status"], "FETCHED");
        assert_eq!(json["pending"][0]["event_type"], "UPLOADED");
    }
}
