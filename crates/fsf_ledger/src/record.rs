//! Ledger records.

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use fsf_protocol::EventType;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;

/// Sync status of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Event was persisted but not yet applied and acknowledged.
    Fetched,
    /// Event was applied and acknowledged.
    Acked,
}

impl SyncStatus {
    /// Returns the stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Fetched => "FETCHED",
            SyncStatus::Acked => "ACKED",
        }
    }

    /// Parses a stored string.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        match raw {
            "FETCHED" => Ok(SyncStatus::Fetched),
            "ACKED" => Ok(SyncStatus::Acked),
            other => Err(LedgerError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl ToSql for SyncStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SyncStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        SyncStatus::parse(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One observed event and its acknowledgement state.
///
/// Records are never physically deleted; `is_del` is reserved for a future
/// soft-delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRecord {
    /// Local surrogate key.
    pub id: i64,
    /// Event id assigned by the file-service (unique).
    pub event_id: u64,
    /// Key of the affected file.
    pub file_key: String,
    /// Kind of change.
    pub event_type: EventType,
    /// Sync status.
    pub sync_status: SyncStatus,
    /// When the event was first persisted.
    pub fetch_time: DateTime<Utc>,
    /// When the event was acknowledged.
    pub ack_time: Option<DateTime<Utc>>,
    /// Instance that created the record.
    pub create_by: String,
    /// Last update time.
    pub update_time: DateTime<Utc>,
    /// Instance that last updated the record.
    pub update_by: String,
    /// Soft-delete flag.
    pub is_del: bool,
}

/// Number of records per sync status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Records in `Fetched`.
    pub fetched: u64,
    /// Records in `Acked`.
    pub acked: u64,
}

impl StatusCounts {
    /// Total number of records.
    pub fn total(&self) -> u64 {
        self.fetched + self.acked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(SyncStatus::Fetched.as_str(), "FETCHED");
        assert_eq!(SyncStatus::parse("ACKED").unwrap(), SyncStatus::Acked);
        assert!(matches!(
            SyncStatus::parse("DONE"),
            Err(LedgerError::UnknownStatus(ref s)) if s == "DONE"
        ));
    }

    #[test]
    fn counts_total() {
        let counts = StatusCounts {
            fetched: 1,
            acked: 41,
        };
        assert_eq!(counts.total(), 42);
    }
}
