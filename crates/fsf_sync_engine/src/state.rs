//! Sync engine state machine.

use crate::applier::FileApplier;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::gateway::EventGateway;
use fsf_ledger::{EventLedger, LedgerError, LedgerRecord};
use fsf_protocol::Event;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No pass is running.
    Idle,
    /// Re-applying an event left unacknowledged by an earlier pass.
    Recovering,
    /// Polling and applying new events.
    Draining,
    /// The last pass stopped at an error.
    Aborted,
}

impl SyncState {
    /// Returns true if a pass is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Recovering | SyncState::Draining)
    }

    /// Returns true if a new pass can start.
    pub fn can_start_pass(&self) -> bool {
        !self.is_active()
    }
}

/// Statistics about sync passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes that drained every available event.
    pub passes_completed: u64,
    /// Passes that stopped at an error.
    pub passes_aborted: u64,
    /// Events applied and acknowledged while draining.
    pub events_applied: u64,
    /// Events applied and acknowledged during recovery.
    pub events_recovered: u64,
    /// End of the last pass.
    pub last_pass_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Event re-applied during recovery.
    pub recovered: Option<u64>,
    /// Number of new events applied and acknowledged.
    pub applied: u64,
    /// Last event acknowledged by this pass.
    pub last_event_id: Option<u64>,
    /// Duration of the pass.
    pub duration: Duration,
}

impl PassReport {
    /// Returns true if the pass changed neither ledger nor file store.
    pub fn is_noop(&self) -> bool {
        self.recovered.is_none() && self.applied == 0
    }
}

/// The sync engine replays file-service events onto local disk.
///
/// One pass first re-applies the single event an interrupted pass may have
/// left unacknowledged, then polls and applies new events in ascending id
/// order until the file-service has no more. Each event is persisted, applied
/// and acknowledged before the next one is looked at, so at most one event is
/// ever outstanding.
///
/// The engine does not serialize passes itself; run it through a
/// [`SyncService`](crate::SyncService).
pub struct SyncEngine<G: EventGateway, L: EventLedger> {
    config: SyncConfig,
    gateway: Arc<G>,
    ledger: Arc<L>,
    applier: FileApplier<G>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<G: EventGateway, L: EventLedger> SyncEngine<G, L> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, gateway: G, ledger: L) -> Self {
        Self::with_shared(config, Arc::new(gateway), Arc::new(ledger))
    }

    /// Creates a sync engine over a shared gateway and ledger.
    pub fn with_shared(config: SyncConfig, gateway: Arc<G>, ledger: Arc<L>) -> Self {
        let applier = FileApplier::new(Arc::clone(&gateway), config.file_base.clone());
        Self {
            config,
            gateway,
            ledger,
            applier,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the gateway.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Gets the ledger.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Gets the applier.
    pub fn applier(&self) -> &FileApplier<G> {
        &self.applier
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Runs one full pass: recovery, then draining until no events remain.
    ///
    /// Any error stops the pass immediately. The failing event, if any, stays
    /// `FETCHED` in the ledger and is re-applied by the next pass.
    pub fn run_pass(&self) -> SyncResult<PassReport> {
        {
            let mut state = self.state.write();
            if !state.can_start_pass() {
                return Err(SyncError::InvalidStateTransition {
                    from: format!("{:?}", *state),
                    to: "Recovering".into(),
                });
            }
            *state = SyncState::Recovering;
        }

        let start = Instant::now();
        let mut report = PassReport::default();

        let result = self.recover().and_then(|recovered| {
            report.recovered = recovered;
            report.last_event_id = recovered;
            self.drain(&mut report)
        });
        report.duration = start.elapsed();

        match result {
            Ok(()) => {
                self.set_state(SyncState::Idle);
                let mut stats = self.stats.write();
                stats.passes_completed += 1;
                stats.last_pass_time = Some(Instant::now());
                stats.last_error = None;
                Ok(report)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Re-applies the event left unacknowledged by an interrupted pass.
    fn recover(&self) -> SyncResult<Option<u64>> {
        let pending = self
            .ledger
            .pending_records(2)
            .inspect_err(|e| error!(error = %e, "failed to find unacknowledged event"))?;

        match pending.as_slice() {
            [] => {
                info!("no unacknowledged event found");
                Ok(None)
            }
            [record] => {
                info!(
                    event_id = record.event_id,
                    file_key = %record.file_key,
                    "re-applying unacknowledged event"
                );
                self.apply_and_ack(record)?;
                self.stats.write().events_recovered += 1;
                Ok(Some(record.event_id))
            }
            records => {
                let event_ids: Vec<u64> = records.iter().map(|r| r.event_id).collect();
                error!(?event_ids, "more than one unacknowledged event in ledger");
                Err(SyncError::LedgerCorruption { event_ids })
            }
        }
    }

    /// Polls and applies events until the file-service returns none.
    fn drain(&self, report: &mut PassReport) -> SyncResult<()> {
        self.set_state(SyncState::Draining);

        loop {
            let offset = self
                .ledger
                .last_event_id()
                .inspect_err(|e| error!(error = %e, "failed to find last event id"))?;
            info!(offset, "last event id, fetching more");

            let mut events = self
                .gateway
                .poll_events(offset, self.config.page_size)
                .inspect_err(|e| error!(offset, error = %e, "failed to poll events"))?;

            if events.is_empty() {
                debug!(offset, "no new events");
                return Ok(());
            }

            let received = events.len();
            events.retain(|e| e.event_id > offset);
            if events.len() < received {
                warn!(
                    offset,
                    discarded = received - events.len(),
                    "discarding polled events at or below offset"
                );
            }
            if events.is_empty() {
                return Err(SyncError::Protocol(format!(
                    "poll after event {offset} returned no newer event"
                )));
            }

            events.sort_by_key(|e| e.event_id);
            events.dedup_by_key(|e| e.event_id);

            for event in &events {
                self.process_event(event)?;
                report.applied += 1;
                report.last_event_id = Some(event.event_id);
                self.stats.write().events_applied += 1;
            }
        }
    }

    /// Persists, applies and acknowledges one polled event.
    fn process_event(&self, event: &Event) -> SyncResult<()> {
        let event_id = event.event_id;
        debug!(event_id, "handling event");

        let inserted = self
            .ledger
            .save_fetched(event)
            .inspect_err(|e| error!(event_id, error = %e, "failed to save event"))?;
        if !inserted {
            debug!(event_id, "event was already recorded");
        }

        let record = self
            .ledger
            .find_by_event_id(event_id)?
            .ok_or(LedgerError::EventNotFound(event_id))?;

        self.apply_and_ack(&record)?;
        info!(event_id, "event applied and acknowledged");
        Ok(())
    }

    fn apply_and_ack(&self, record: &LedgerRecord) -> SyncResult<()> {
        let event_id = record.event_id;
        let outcome = self
            .applier
            .apply(event_id, &record.file_key, &record.event_type)
            .inspect_err(|e| error!(event_id, error = %e, "failed to apply event"))?;
        debug!(event_id, ?outcome, "event applied");

        self.ledger
            .mark_acked(record.id)
            .inspect_err(|e| error!(event_id, error = %e, "failed to acknowledge event"))?;
        Ok(())
    }

    /// Handles an error by updating state and stats.
    fn handle_error(&self, error: &SyncError) {
        self.set_state(SyncState::Aborted);
        let mut stats = self.stats.write();
        stats.passes_aborted += 1;
        stats.last_pass_time = Some(Instant::now());
        stats.last_error = Some(error.to_string());
    }
}
