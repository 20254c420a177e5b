//! Ledger store abstraction.

use crate::error::LedgerResult;
use crate::record::{LedgerRecord, StatusCounts};
use fsf_protocol::Event;
use std::sync::Arc;

/// Durable table of observed events and their acknowledgement state.
///
/// Implementations must guarantee that at most one record exists per event id.
/// Every method is a single statement against the store; callers serialize
/// passes through an exclusion lock, so no multi-statement transactions are
/// required.
pub trait EventLedger: Send + Sync {
    /// Returns the largest recorded event id, or 0 when the ledger is empty.
    fn last_event_id(&self) -> LedgerResult<u64>;

    /// Returns up to `limit` records in `Fetched` state, newest event first.
    fn pending_records(&self, limit: usize) -> LedgerResult<Vec<LedgerRecord>>;

    /// Persists `event` as `Fetched` unless a record with its event id exists.
    ///
    /// Returns true if a new record was inserted.
    fn save_fetched(&self, event: &Event) -> LedgerResult<bool>;

    /// Looks up the record of an event id.
    fn find_by_event_id(&self, event_id: u64) -> LedgerResult<Option<LedgerRecord>>;

    /// Flips the record with surrogate id `id` to `Acked`.
    fn mark_acked(&self, id: i64) -> LedgerResult<()>;

    /// Counts records per sync status.
    fn count_by_status(&self) -> LedgerResult<StatusCounts>;

    /// Lists up to `limit` records with event id greater than `after_event_id`,
    /// oldest first.
    fn list_after(&self, after_event_id: u64, limit: usize) -> LedgerResult<Vec<LedgerRecord>>;
}

impl<L: EventLedger + ?Sized> EventLedger for Arc<L> {
    fn last_event_id(&self) -> LedgerResult<u64> {
        (**self).last_event_id()
    }

    fn pending_records(&self, limit: usize) -> LedgerResult<Vec<LedgerRecord>> {
        (**self).pending_records(limit)
    }

    fn save_fetched(&self, event: &Event) -> LedgerResult<bool> {
        (**self).save_fetched(event)
    }

    fn find_by_event_id(&self, event_id: u64) -> LedgerResult<Option<LedgerRecord>> {
        (**self).find_by_event_id(event_id)
    }

    fn mark_acked(&self, id: i64) -> LedgerResult<()> {
        (**self).mark_acked(id)
    }

    fn count_by_status(&self) -> LedgerResult<StatusCounts> {
        (**self).count_by_status()
    }

    fn list_after(&self, after_event_id: u64, limit: usize) -> LedgerResult<Vec<LedgerRecord>> {
        (**self).list_after(after_event_id, limit)
    }
}
