//! Error types for the ledger.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while reading or writing the ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while preparing the ledger location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No record exists with the given surrogate id.
    #[error("ledger record {0} not found")]
    RecordNotFound(i64),

    /// No record exists for the given event id.
    #[error("no ledger record for event {0}")]
    EventNotFound(u64),

    /// The event id does not fit the ledger's integer column.
    #[error("event id {0} exceeds the ledger's integer range")]
    EventIdOutOfRange(u64),

    /// A stored sync status is not one this ledger writes.
    #[error("unknown sync status '{0}'")]
    UnknownStatus(String),
}
