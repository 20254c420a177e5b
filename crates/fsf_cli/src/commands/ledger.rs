//! Ledger listing command.

use super::{open_ledger, CommandResult, OutputFormat};
use crate::config::AppConfig;
use fsf_ledger::{EventLedger, LedgerRecord};

/// Lists records with an event id greater than `after`.
pub fn run(config: &AppConfig, after: u64, limit: usize, format: OutputFormat) -> CommandResult {
    let ledger = open_ledger(config)?;
    let records = ledger.list_after(after, limit)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => print_text_output(&records),
    }
    Ok(())
}

fn print_text_output(records: &[LedgerRecord]) {
    if records.is_empty() {
        println!("No records");
        return;
    }

    println!(
        "{:>10}  {:<8}  {:<10}  {:<25}  {}",
        "EVENT", "STATUS", "TYPE", "FETCHED", "FILE KEY"
    );
    for record in records {
        println!("{}", format_row(record));
    }
}

fn format_row(record: &LedgerRecord) -> String {
    format!(
        "{:>10}  {:<8}  {:<10}  {:<25}  {}",
        record.event_id,
        record.sync_status,
        record.event_type,
        record.fetch_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        record.file_key
    )
}
