//! Scheduler entry point.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::exclusion::{exclusion_for, Exclusion};
use crate::gateway::EventGateway;
use crate::state::{PassReport, SyncEngine};
use fsf_ledger::EventLedger;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened on one scheduler tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A pass ran to completion.
    Completed(PassReport),
    /// A pass ran and stopped at an error.
    Failed(SyncError),
    /// Another pass held the lock; nothing ran.
    Skipped,
}

impl TickOutcome {
    /// Returns true if a pass ran to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, TickOutcome::Completed(_))
    }

    /// Returns true if the tick was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, TickOutcome::Skipped)
    }
}

/// Runs sync passes under an exclusive lock.
pub struct SyncService<G: EventGateway, L: EventLedger> {
    engine: Arc<SyncEngine<G, L>>,
    exclusion: Box<dyn Exclusion>,
    resource: String,
}

impl<G: EventGateway, L: EventLedger> SyncService<G, L> {
    /// Creates a service with an explicit exclusion provider.
    pub fn new(
        engine: Arc<SyncEngine<G, L>>,
        exclusion: Box<dyn Exclusion>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            exclusion,
            resource: resource.into(),
        }
    }

    /// Validates `config` and builds the engine and the exclusion provider it
    /// selects.
    pub fn from_config(config: SyncConfig, gateway: G, ledger: L) -> SyncResult<Self> {
        config.validate()?;
        let exclusion = exclusion_for(&config)?;
        let resource = config.lock_resource.clone();
        info!(mode = %config.mode, resource = %resource, "sync service configured");
        let engine = Arc::new(SyncEngine::new(config, gateway, ledger));
        Ok(Self::new(engine, exclusion, resource))
    }

    /// Gets the engine.
    pub fn engine(&self) -> &Arc<SyncEngine<G, L>> {
        &self.engine
    }

    /// Gets the lock resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Runs one pass if the lock can be taken.
    ///
    /// Errors never escape; they are logged and returned as
    /// [`TickOutcome::Failed`].
    pub fn sync_once(&self) -> TickOutcome {
        let mut result = None;
        let acquired = self
            .exclusion
            .run_exclusive(&self.resource, &mut || {
                result = Some(self.engine.run_pass());
            });

        match (acquired, result) {
            (Ok(true), Some(Ok(report))) => {
                if report.is_noop() {
                    debug!("sync pass found nothing to do");
                } else {
                    info!(
                        recovered = ?report.recovered,
                        applied = report.applied,
                        last_event_id = ?report.last_event_id,
                        elapsed_ms = report.duration.as_millis() as u64,
                        "sync pass completed"
                    );
                }
                TickOutcome::Completed(report)
            }
            (Ok(true), Some(Err(e))) => {
                error!(error = %e, retryable = e.is_retryable(), "sync pass failed");
                TickOutcome::Failed(e)
            }
            (Ok(_), _) => {
                debug!(resource = %self.resource, "sync lock busy, skipping tick");
                TickOutcome::Skipped
            }
            (Err(e), _) => {
                warn!(resource = %self.resource, error = %e, "failed to acquire sync lock, skipping tick");
                TickOutcome::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::LocalExclusion;
    use crate::gateway::MemoryGateway;
    use fsf_ledger::SqliteLedger;
    use tempfile::TempDir;

    /// Never grants the lock.
    struct Busy;

    impl Exclusion for Busy {
        fn run_exclusive(&self, _resource: &str, _pass: &mut dyn FnMut()) -> SyncResult<bool> {
            Ok(false)
        }
    }

    /// Fails to operate the lock.
    struct Broken;

    impl Exclusion for Broken {
        fn run_exclusive(&self, _resource: &str, _pass: &mut dyn FnMut()) -> SyncResult<bool> {
            Err(SyncError::Lock("lock store unreachable".into()))
        }
    }

    fn engine(dir: &TempDir) -> Arc<SyncEngine<MemoryGateway, SqliteLedger>> {
        Arc::new(SyncEngine::new(
            SyncConfig::new(dir.path()),
            MemoryGateway::new(),
            SqliteLedger::open_in_memory("test").unwrap(),
        ))
    }

    #[test]
    fn sync_once_completes() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.gateway().upload(1, "k1", b"x".to_vec());

        let service = SyncService::new(engine, Box::new(LocalExclusion::new()), "r");
        match service.sync_once() {
            TickOutcome::Completed(report) => assert_eq!(report.applied, 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn sync_once_reports_failure() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.gateway().set_connected(false);

        let service = SyncService::new(engine, Box::new(LocalExclusion::new()), "r");
        assert!(matches!(
            service.sync_once(),
            TickOutcome::Failed(SyncError::NotConnected)
        ));
    }

    #[test]
    fn busy_or_broken_lock_skips() {
        let dir = TempDir::new().unwrap();
        for exclusion in [Box::new(Busy) as Box<dyn Exclusion>, Box::new(Broken)] {
            let engine = engine(&dir);
            let service = SyncService::new(Arc::clone(&engine), exclusion, "r");
            assert!(service.sync_once().is_skipped());
            assert_eq!(engine.gateway().request_count(), 0);
        }
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let result = SyncService::from_config(
            SyncConfig::default(),
            MemoryGateway::new(),
            SqliteLedger::open_in_memory("test").unwrap(),
        );
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
