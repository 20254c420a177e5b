//! # fsf Sync Engine
//!
//! Replicates the file-service's file store onto a follower's local disk by
//! replaying the file-service's ordered event log.
//!
//! This crate provides:
//! - The gateway abstraction over the file-service, with an HTTP client and
//!   an in-memory stand-in for tests
//! - The file applier, materializing one event on local disk
//! - The sync state machine (idle → recovering → draining → idle)
//! - Pass exclusion, in-process or across replicas
//! - The scheduler entry point, [`SyncService::sync_once`]
//!
//! ## Architecture
//!
//! A pass runs in two phases:
//! 1. Recover: re-apply the one event an interrupted pass may have left
//!    unacknowledged in the ledger
//! 2. Drain: poll after the largest recorded event id and, for each event,
//!    record it as fetched, apply it, acknowledge it
//!
//! ## Key Invariants
//!
//! - Events are applied in strictly increasing id order
//! - An event is acknowledged only after it was applied
//! - At most one event is unacknowledged at any time
//! - Applying an event again converges to the same local state
//! - Passes never overlap

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod config;
mod error;
mod exclusion;
mod gateway;
mod http;
mod service;
mod state;

pub use applier::{ApplyOutcome, FileApplier};
pub use config::{
    ExclusionMode, GatewayConfig, SyncConfig, DEFAULT_LOCK_RESOURCE, DEFAULT_PAGE_SIZE,
};
pub use error::{ApplyError, SyncError, SyncResult};
pub use exclusion::{exclusion_for, Exclusion, FileLockExclusion, LocalExclusion};
pub use gateway::{EventGateway, MemoryGateway};
pub use http::{HttpClient, HttpError, HttpGateway, UreqClient};
pub use service::{SyncService, TickOutcome};
pub use state::{PassReport, SyncEngine, SyncState, SyncStats};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
