//! Error types for the sync engine.

use fsf_ledger::LedgerError;
use fsf_protocol::ProtocolError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The file-service reported an error.
    #[error("file-service error [{code}]: {message}")]
    Server {
        /// Error code reported by the file-service.
        code: String,
        /// Error message reported by the file-service.
        message: String,
    },

    /// Protocol error (malformed payload or unexpected response).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Local file-system error while applying an event.
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),

    /// More than one event is awaiting acknowledgement.
    #[error("ledger corruption: several unacknowledged events {event_ids:?}")]
    LedgerCorruption {
        /// Event ids of the unacknowledged records found.
        event_ids: Vec<u64>,
    },

    /// The exclusion lock could not be operated.
    #[error("lock error: {0}")]
    Lock(String),

    /// Not connected to the file-service.
    #[error("not connected to file-service")]
    NotConnected,

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

/// Errors raised while mutating local file-system state.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// The file key cannot be mapped to a path under the base directory.
    #[error("invalid file key '{0}'")]
    InvalidFileKey(String),

    /// A file-system operation failed.
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        /// Operation that failed.
        action: &'static str,
        /// Path that was operated on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the next scheduled pass may succeed without operator
    /// intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Config(_) => false,
            SyncError::LedgerCorruption { .. } => false,
            SyncError::Apply(ApplyError::InvalidFileKey(_)) => false,
            _ => true,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Server { code, message } => SyncError::Server { code, message },
            other => SyncError::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::NotConnected.is_retryable());
        assert!(SyncError::Ledger(LedgerError::RecordNotFound(1)).is_retryable());
        assert!(!SyncError::Config("missing secret".into()).is_retryable());
        assert!(!SyncError::LedgerCorruption {
            event_ids: vec![3, 2]
        }
        .is_retryable());
    }

    #[test]
    fn server_error_from_protocol() {
        let err = SyncError::from(ProtocolError::Server {
            code: "E1".into(),
            message: "bad secret".into(),
        });
        assert!(matches!(err, SyncError::Server { ref code, .. } if code == "E1"));
        assert!(err.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::LedgerCorruption {
            event_ids: vec![9, 4],
        };
        assert!(err.to_string().contains("[9, 4]"));

        let err = SyncError::from(ApplyError::io(
            "remove",
            "/data/k1",
            io::Error::from(io::ErrorKind::PermissionDenied),
        ));
        assert!(err.to_string().contains("remove /data/k1"));
    }
}
