//! # fsf Ledger
//!
//! Durable acknowledgement ledger for the file-service follower.
//!
//! Every event observed from the file-service is recorded once, first as
//! `FETCHED` and, after it was applied to local disk, as `ACKED`. The ledger
//! is the follower's only cursor: the next poll starts after the largest
//! recorded event id.
//!
//! ## Key Invariants
//!
//! - At most one record per event id
//! - Records are never physically deleted
//! - At most one record is `FETCHED` at any time (upheld by the sync engine)

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod record;
mod sqlite;
mod store;

pub use error::{LedgerError, LedgerResult};
pub use record::{LedgerRecord, StatusCounts, SyncStatus};
pub use sqlite::SqliteLedger;
pub use store::EventLedger;
