//! Mutual exclusion of sync passes.
//!
//! A pass must never overlap another pass touching the same ledger and file
//! store. In a single process that is an in-process mutex; across replicas it
//! is an advisory file lock on storage every replica can see:
//!
//! ```text
//! <lock_dir>/
//! └─ fsf_sync_file.lock     # one file per lock resource
//! ```

use crate::config::{ExclusionMode, SyncConfig};
use crate::error::{SyncError, SyncResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Runs closures under a named exclusive lock.
pub trait Exclusion: Send + Sync {
    /// Runs `pass` while holding the lock named `resource`.
    ///
    /// Returns `Ok(false)` without running `pass` when the lock is held
    /// elsewhere and this provider does not wait for it.
    fn run_exclusive(&self, resource: &str, pass: &mut dyn FnMut()) -> SyncResult<bool>;
}

/// In-process exclusion; waits for the running pass to finish.
#[derive(Debug, Default)]
pub struct LocalExclusion {
    lock: Mutex<()>,
}

impl LocalExclusion {
    /// Creates a new local exclusion.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Exclusion for LocalExclusion {
    fn run_exclusive(&self, resource: &str, pass: &mut dyn FnMut()) -> SyncResult<bool> {
        let _guard = self.lock.lock();
        debug!(resource, "acquired local sync lock");
        pass();
        Ok(true)
    }
}

/// Cross-process exclusion backed by advisory file locks.
///
/// Acquisition never waits: if another process (or another thread of this
/// one) holds the lock, the pass is skipped.
#[derive(Debug, Clone)]
pub struct FileLockExclusion {
    lock_dir: PathBuf,
}

impl FileLockExclusion {
    /// Creates a file-lock exclusion rooted at `lock_dir`, creating the
    /// directory if needed.
    pub fn new(lock_dir: impl Into<PathBuf>) -> SyncResult<Self> {
        let lock_dir = lock_dir.into();
        fs::create_dir_all(&lock_dir).map_err(|e| {
            SyncError::Lock(format!(
                "failed to create lock directory {}: {e}",
                lock_dir.display()
            ))
        })?;
        Ok(Self { lock_dir })
    }

    /// Returns the lock file path for a resource name.
    pub fn lock_path(&self, resource: &str) -> PathBuf {
        let name: String = resource
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.lock_dir.join(format!("{name}.lock"))
    }

    fn try_acquire(&self, resource: &str) -> SyncResult<Option<LockGuard>> {
        let path = self.lock_path(resource);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| SyncError::Lock(format!("failed to open {}: {e}", path.display())))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(LockGuard { file })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(SyncError::Lock(format!(
                "failed to lock {}: {e}",
                path.display()
            ))),
        }
    }
}

impl Exclusion for FileLockExclusion {
    fn run_exclusive(&self, resource: &str, pass: &mut dyn FnMut()) -> SyncResult<bool> {
        let Some(_guard) = self.try_acquire(resource)? else {
            debug!(resource, "sync lock held elsewhere");
            return Ok(false);
        };
        debug!(resource, "acquired cluster sync lock");
        pass();
        Ok(true)
    }
}

/// Releases the file lock on drop.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "failed to release sync lock");
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Builds the exclusion provider selected by the configuration.
pub fn exclusion_for(config: &SyncConfig) -> SyncResult<Box<dyn Exclusion>> {
    match (config.mode, &config.lock_dir) {
        (ExclusionMode::Standalone, _) => Ok(Box::new(LocalExclusion::new())),
        (ExclusionMode::Cluster, Some(dir)) => Ok(Box::new(FileLockExclusion::new(dir)?)),
        (ExclusionMode::Cluster, None) => Err(SyncError::Config(
            "cluster mode requires a shared lock directory".into(),
        )),
    }
}
