//! SQLite-backed ledger.
//!
//! The ledger lives in a single table:
//!
//! ```text
//! file_event_sync
//! ├─ id           INTEGER PRIMARY KEY AUTOINCREMENT
//! ├─ event_id     INTEGER, unique (event_id_uk)
//! ├─ file_key / event_type
//! ├─ sync_status  'FETCHED' | 'ACKED'
//! ├─ fetch_time / ack_time
//! └─ create_time / create_by / update_time / update_by / is_del
//! ```

use crate::error::{LedgerError, LedgerResult};
use crate::record::{LedgerRecord, StatusCounts, SyncStatus};
use crate::store::EventLedger;
use chrono::Utc;
use fsf_protocol::{Event, EventType};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file_event_sync (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL DEFAULT 0,
    file_key VARCHAR(64) NOT NULL,
    event_type VARCHAR(25) NOT NULL,
    sync_status VARCHAR(10) NOT NULL DEFAULT 'FETCHED',
    fetch_time TIMESTAMP NOT NULL,
    ack_time TIMESTAMP NULL DEFAULT NULL,
    create_time TIMESTAMP NOT NULL,
    create_by VARCHAR(255) NOT NULL DEFAULT '',
    update_time TIMESTAMP NOT NULL,
    update_by VARCHAR(255) NOT NULL DEFAULT '',
    is_del INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX IF NOT EXISTS event_id_uk ON file_event_sync (event_id);
CREATE INDEX IF NOT EXISTS sync_status_idx ON file_event_sync (sync_status, event_id);
";

const RECORD_COLUMNS: &str = "id, event_id, file_key, event_type, sync_status, fetch_time, \
                              ack_time, create_by, update_time, update_by, is_del";

/// How long a statement waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A ledger stored in a SQLite database.
///
/// The connection is guarded by a mutex, so one `SqliteLedger` can be shared
/// across threads. Several processes may open the same database file; SQLite
/// serializes their writes and the unique index on `event_id` holds for all of
/// them.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    /// Written to the audit columns.
    instance: String,
}

impl SqliteLedger {
    /// Opens (or creates) the ledger database at `path`.
    ///
    /// Missing parent directories are created and the schema is initialized.
    pub fn open(path: &Path, instance: impl Into<String>) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        info!(path = %path.display(), "opened ledger");
        Self::with_connection(conn, instance)
    }

    /// Opens a ledger that lives only in memory.
    pub fn open_in_memory(instance: impl Into<String>) -> LedgerResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, instance)
    }

    fn with_connection(conn: Connection, instance: impl Into<String>) -> LedgerResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            instance: instance.into(),
        })
    }

    /// Returns the instance name written to the audit columns.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> LedgerResult<Vec<LedgerRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, record_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl EventLedger for SqliteLedger {
    fn last_event_id(&self) -> LedgerResult<u64> {
        let conn = self.conn.lock();
        let last: i64 = conn.query_row(
            "SELECT COALESCE(MAX(event_id), 0) FROM file_event_sync",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(last).unwrap_or(0))
    }

    fn pending_records(&self, limit: usize) -> LedgerResult<Vec<LedgerRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM file_event_sync \
             WHERE sync_status = ?1 ORDER BY event_id DESC LIMIT ?2"
        );
        self.query_records(&sql, params![SyncStatus::Fetched, sql_limit(limit)])
    }

    fn save_fetched(&self, event: &Event) -> LedgerResult<bool> {
        let event_id = sql_event_id(event.event_id)?;
        let now = Utc::now();
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO file_event_sync \
             (event_id, file_key, event_type, sync_status, fetch_time, \
              create_time, create_by, update_time, update_by) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?5, ?6) \
             ON CONFLICT(event_id) DO NOTHING",
            params![
                event_id,
                event.file_key,
                event.event_type.as_str(),
                SyncStatus::Fetched,
                now,
                self.instance,
            ],
        )?;

        if inserted == 0 {
            debug!(event_id = event.event_id, "event already recorded");
        }
        Ok(inserted == 1)
    }

    fn find_by_event_id(&self, event_id: u64) -> LedgerResult<Option<LedgerRecord>> {
        let event_id = sql_event_id(event_id)?;
        let sql = format!("SELECT {RECORD_COLUMNS} FROM file_event_sync WHERE event_id = ?1");
        let conn = self.conn.lock();
        let record = conn
            .query_row(&sql, params![event_id], record_from_row)
            .optional()?;
        Ok(record)
    }

    fn mark_acked(&self, id: i64) -> LedgerResult<()> {
        let now = Utc::now();
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE file_event_sync \
             SET sync_status = ?1, ack_time = ?2, update_time = ?2, update_by = ?3 \
             WHERE id = ?4",
            params![SyncStatus::Acked, now, self.instance, id],
        )?;
        if updated == 0 {
            return Err(LedgerError::RecordNotFound(id));
        }
        Ok(())
    }

    fn count_by_status(&self) -> LedgerResult<StatusCounts> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT sync_status, COUNT(*) FROM file_event_sync GROUP BY sync_status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, SyncStatus>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row?;
            let count = u64::try_from(count).unwrap_or(0);
            match status {
                SyncStatus::Fetched => counts.fetched = count,
                SyncStatus::Acked => counts.acked = count,
            }
        }
        Ok(counts)
    }

    fn list_after(&self, after_event_id: u64, limit: usize) -> LedgerResult<Vec<LedgerRecord>> {
        let after = sql_event_id(after_event_id)?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM file_event_sync \
             WHERE event_id > ?1 ORDER BY event_id ASC LIMIT ?2"
        );
        self.query_records(&sql, params![after, sql_limit(limit)])
    }
}

fn sql_event_id(event_id: u64) -> LedgerResult<i64> {
    i64::try_from(event_id).map_err(|_| LedgerError::EventIdOutOfRange(event_id))
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerRecord> {
    let event_id: i64 = row.get(1)?;
    let event_id =
        u64::try_from(event_id).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(1, event_id))?;
    let event_type: String = row.get(3)?;

    Ok(LedgerRecord {
        id: row.get(0)?,
        event_id,
        file_key: row.get(2)?,
        event_type: EventType::from(event_type),
        sync_status: row.get(4)?,
        fetch_time: row.get(5)?,
        ack_time: row.get(6)?,
        create_by: row.get(7)?,
        update_time: row.get(8)?,
        update_by: row.get(9)?,
        is_del: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> SqliteLedger {
        SqliteLedger::open_in_memory("test-node").unwrap()
    }

    #[test]
    fn empty_ledger() {
        let ledger = ledger();
        assert_eq!(ledger.last_event_id().unwrap(), 0);
        assert!(ledger.pending_records(1).unwrap().is_empty());
        assert_eq!(ledger.count_by_status().unwrap(), StatusCounts::default());
    }

    #[test]
    fn save_fetched_then_ack() {
        let ledger = ledger();
        assert!(ledger.save_fetched(&Event::added(3, "k3")).unwrap());

        let record = ledger.find_by_event_id(3).unwrap().unwrap();
        assert_eq!(record.file_key, "k3");
        assert_eq!(record.event_type, EventType::Added);
        assert_eq!(record.sync_status, SyncStatus::Fetched);
        assert_eq!(record.create_by, "test-node");
        assert!(record.ack_time.is_none());
        assert!(!record.is_del);

        ledger.mark_acked(record.id).unwrap();
        let record = ledger.find_by_event_id(3).unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Acked);
        assert!(record.ack_time.is_some());
        assert_eq!(ledger.last_event_id().unwrap(), 3);
    }

    #[test]
    fn duplicate_event_id_is_ignored() {
        let ledger = ledger();
        assert!(ledger.save_fetched(&Event::added(1, "k1")).unwrap());
        assert!(!ledger.save_fetched(&Event::deleted(1, "other")).unwrap());

        let record = ledger.find_by_event_id(1).unwrap().unwrap();
        assert_eq!(record.file_key, "k1");
        assert_eq!(ledger.count_by_status().unwrap().total(), 1);
    }

    #[test]
    fn mark_acked_only_touches_one_record() {
        let ledger = ledger();
        ledger.save_fetched(&Event::added(1, "a")).unwrap();
        ledger.save_fetched(&Event::added(2, "b")).unwrap();

        let first = ledger.find_by_event_id(1).unwrap().unwrap();
        ledger.mark_acked(first.id).unwrap();

        let pending = ledger.pending_records(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_id, 2);
    }

    #[test]
    fn mark_acked_unknown_id() {
        let ledger = ledger();
        assert!(matches!(
            ledger.mark_acked(99),
            Err(LedgerError::RecordNotFound(99))
        ));
    }

    #[test]
    fn pending_records_newest_first() {
        let ledger = ledger();
        for id in [4, 9, 6] {
            ledger.save_fetched(&Event::added(id, format!("k{id}"))).unwrap();
        }
        let ids: Vec<u64> = ledger
            .pending_records(2)
            .unwrap()
            .iter()
            .map(|r| r.event_id)
            .collect();
        assert_eq!(ids, vec![9, 6]);
    }

    #[test]
    fn unknown_event_type_round_trips() {
        let ledger = ledger();
        let event = Event::new(5, EventType::Unknown("MOVED".into()), "k5");
        ledger.save_fetched(&event).unwrap();
        let record = ledger.find_by_event_id(5).unwrap().unwrap();
        assert_eq!(record.event_type, EventType::Unknown("MOVED".into()));
    }

    #[test]
    fn event_id_out_of_range() {
        let ledger = ledger();
        let result = ledger.save_fetched(&Event::added(u64::MAX, "k"));
        assert!(matches!(result, Err(LedgerError::EventIdOutOfRange(_))));
    }

    #[test]
    fn list_after_is_ascending_and_bounded() {
        let ledger = ledger();
        for id in 1..=5 {
            ledger.save_fetched(&Event::added(id, "k")).unwrap();
        }
        let ids: Vec<u64> = ledger
            .list_after(2, 2)
            .unwrap()
            .iter()
            .map(|r| r.event_id)
            .collect();
        assert_eq!(ids, vec![3, 4]);
    }
}
