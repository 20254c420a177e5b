//! File-system event applier.
//!
//! Materializes a single event onto the local file store:
//!
//! ```text
//! <file_base>/
//! ├─ <fileKey>     # full copy of a remote file
//! └─ ...
//! ```
//!
//! Every apply starts from the file-service's current metadata and rewrites
//! the whole artifact, so applying an event again after a crash converges to
//! the same state.

use crate::error::{ApplyError, SyncResult};
use crate::gateway::EventGateway;
use fsf_protocol::{EventType, FileType};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What applying an event did to the local file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The file-service has no record of the file; nothing was done.
    RemoteAbsent,
    /// The local artifact was removed.
    Removed,
    /// A delete found no local artifact.
    AlreadyAbsent,
    /// The event kind needs no local change.
    Ignored,
    /// The entry is a directory; directories are metadata only.
    Directory,
    /// The artifact was rewritten with `bytes` bytes.
    Downloaded {
        /// Number of bytes written.
        bytes: u64,
    },
}

/// Applies file events to a local directory.
pub struct FileApplier<G: EventGateway> {
    gateway: Arc<G>,
    base: PathBuf,
}

impl<G: EventGateway> FileApplier<G> {
    /// Creates an applier writing under `base`.
    pub fn new(gateway: Arc<G>, base: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            base: base.into(),
        }
    }

    /// Returns the base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the local path of the artifact for `file_key`.
    ///
    /// The key must be a single normal path component so the artifact always
    /// lives directly under the base directory.
    pub fn resolve_path(&self, file_key: &str) -> Result<PathBuf, ApplyError> {
        let mut components = Path::new(file_key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == file_key => Ok(self.base.join(name)),
            _ => Err(ApplyError::InvalidFileKey(file_key.to_string())),
        }
    }

    /// Applies one event.
    ///
    /// The file key is only checked against the base directory when the event
    /// touches a local artifact. The ledger is not touched; acknowledging is up
    /// to the caller.
    pub fn apply(
        &self,
        event_id: u64,
        file_key: &str,
        event_type: &EventType,
    ) -> SyncResult<ApplyOutcome> {
        let Some(info) = self.gateway.fetch_file_info(file_key)? else {
            info!(event_id, file_key, "file no longer exists on file-service");
            return Ok(ApplyOutcome::RemoteAbsent);
        };

        match event_type {
            EventType::Deleted => {
                let path = self.resolve_path(file_key)?;
                Ok(self.remove_if_present(&path)?)
            }
            EventType::Added => match info.effective_type() {
                FileType::File => {
                    let path = self.resolve_path(file_key)?;
                    self.download(event_id, file_key, &path)
                }
                FileType::Dir => {
                    info!(event_id, file_key, "file is a directory, nothing to download");
                    Ok(ApplyOutcome::Directory)
                }
                FileType::Unknown(raw) => {
                    warn!(event_id, file_key, file_type = %raw, "unknown file type, skipping");
                    Ok(ApplyOutcome::Ignored)
                }
            },
            other => {
                debug!(event_id, file_key, event_type = %other, "no local change for event");
                Ok(ApplyOutcome::Ignored)
            }
        }
    }

    fn remove_if_present(&self, path: &Path) -> Result<ApplyOutcome, ApplyError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(ApplyOutcome::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ApplyOutcome::AlreadyAbsent),
            Err(e) => Err(ApplyError::io("remove", path, e)),
        }
    }

    fn download(&self, event_id: u64, file_key: &str, path: &Path) -> SyncResult<ApplyOutcome> {
        fs::create_dir_all(&self.base)
            .map_err(|e| ApplyError::io("create directory", &self.base, e))?;

        // Truncates whatever an earlier attempt left behind.
        let mut file = File::create(path).map_err(|e| ApplyError::io("create", path, e))?;
        let bytes = self.gateway.download_file(file_key, &mut file)?;

        if let Err(e) = file.sync_all() {
            warn!(path = %path.display(), error = %e, "failed to close file");
        }

        info!(event_id, file_key, bytes, "file downloaded");
        Ok(ApplyOutcome::Downloaded { bytes })
    }
}
