//! # fsf Protocol
//!
//! Wire types for the file-service sync API.
//!
//! This crate provides:
//! - `Event` and `EventType` for entries of the remote event log
//! - `FileInfo` and `FileType` for remote file metadata
//! - Request bodies and the common response envelope (JSON)
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod event;
mod file_info;
mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{Event, EventType};
pub use file_info::{FileInfo, FileType};
pub use messages::{
    decode_response, encode_request, ApiResponse, FileInfoResponse, FileKeyRequest,
    PollEventsRequest, PollEventsResponse, DOWNLOAD_FILE_PATH, FILE_INFO_PATH, POLL_EVENTS_PATH,
};
