//! Tests for the SQLite ledger on disk.

use fsf_ledger::{EventLedger, SqliteLedger, SyncStatus};
use fsf_protocol::Event;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("ledger.db");

    {
        let ledger = SqliteLedger::open(&path, "node-a").unwrap();
        ledger.save_fetched(&Event::added(10, "k10")).unwrap();
        ledger.save_fetched(&Event::added(11, "k11")).unwrap();
        let record = ledger.find_by_event_id(10).unwrap().unwrap();
        ledger.mark_acked(record.id).unwrap();
    }

    let ledger = SqliteLedger::open(&path, "node-a").unwrap();
    assert_eq!(ledger.last_event_id().unwrap(), 11);
    let pending = ledger.pending_records(2).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].event_id, 11);
    assert_eq!(
        ledger.find_by_event_id(10).unwrap().unwrap().sync_status,
        SyncStatus::Acked
    );
}

#[test]
fn concurrent_duplicate_inserts_keep_one_record() {
    let ledger = Arc::new(SqliteLedger::open_in_memory("node-a").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger
                    .save_fetched(&Event::added(42, format!("k-{i}")))
                    .unwrap()
            })
        })
        .collect();

    let inserted: usize = handles
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();

    assert_eq!(inserted, 1);
    assert_eq!(ledger.count_by_status().unwrap().total(), 1);
}

#[test]
fn two_connections_share_the_unique_constraint() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");

    let a = SqliteLedger::open(&path, "node-a").unwrap();
    let b = SqliteLedger::open(&path, "node-b").unwrap();

    assert!(a.save_fetched(&Event::added(7, "k7")).unwrap());
    assert!(!b.save_fetched(&Event::added(7, "k7")).unwrap());

    let record = b.find_by_event_id(7).unwrap().unwrap();
    assert_eq!(record.create_by, "node-a");
    assert_eq!(b.count_by_status().unwrap().fetched, 1);
}
