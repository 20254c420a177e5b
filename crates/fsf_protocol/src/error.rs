//! Error types for the wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while encoding or decoding sync API messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The file-service answered with `error = true`.
    #[error("file-service error [{code}]: {message}")]
    Server {
        /// Error code reported by the server.
        code: String,
        /// Message reported by the server.
        message: String,
    },

    /// The response body is not a valid envelope.
    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}
