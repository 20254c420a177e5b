//! Request and response bodies of the sync API.

use crate::error::{ProtocolError, ProtocolResult};
use crate::event::Event;
use crate::file_info::FileInfo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Endpoint for polling events after an event id.
pub const POLL_EVENTS_PATH: &str = "/open/api/sync/event/poll";
/// Endpoint for fetching file metadata.
pub const FILE_INFO_PATH: &str = "/open/api/sync/file/info";
/// Endpoint for downloading file bytes.
pub const DOWNLOAD_FILE_PATH: &str = "/open/api/sync/file/download";

/// Body of a poll request.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollEventsRequest<'a> {
    /// Offset: only events with a larger id are returned.
    pub event_id: u64,
    /// Maximum number of events to return.
    pub limit: u32,
    /// Shared sync secret.
    pub secret: &'a str,
}

impl<'a> PollEventsRequest<'a> {
    /// Creates a new poll request.
    pub fn new(event_id: u64, limit: u32, secret: &'a str) -> Self {
        Self {
            event_id,
            limit,
            secret,
        }
    }
}

impl fmt::Debug for PollEventsRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollEventsRequest")
            .field("event_id", &self.event_id)
            .field("limit", &self.limit)
            .field("secret", &"***")
            .finish()
    }
}

/// Body of a file info or file download request.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileKeyRequest<'a> {
    /// Key of the file.
    pub file_key: &'a str,
    /// Shared sync secret.
    pub secret: &'a str,
}

impl<'a> FileKeyRequest<'a> {
    /// Creates a new request for `file_key`.
    pub fn new(file_key: &'a str, secret: &'a str) -> Self {
        Self { file_key, secret }
    }
}

impl fmt::Debug for FileKeyRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKeyRequest")
            .field("file_key", &self.file_key)
            .field("secret", &"***")
            .finish()
    }
}

/// Common response envelope of the file-service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Error code, set when `error` is true.
    pub error_code: Option<String>,
    /// Human readable message.
    pub msg: Option<String>,
    /// Whether the request failed on the server.
    #[serde(default)]
    pub error: bool,
    /// Payload.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Converts the envelope into its payload, failing when the server
    /// reported an error.
    pub fn into_data(self) -> ProtocolResult<Option<T>> {
        if self.error {
            return Err(ProtocolError::Server {
                code: self.error_code.unwrap_or_default(),
                message: self.msg.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(self.data)
    }
}

/// Response of the poll endpoint.
pub type PollEventsResponse = ApiResponse<Vec<Event>>;

/// Response of the file info endpoint. `data` is absent when the file-service
/// no longer has a record for the key.
pub type FileInfoResponse = ApiResponse<FileInfo>;

/// Decodes a response envelope from JSON bytes.
pub fn decode_response<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<ApiResponse<T>> {
    serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
}

/// Encodes a request body as JSON bytes.
pub fn encode_request<T: Serialize>(request: &T) -> ProtocolResult<Vec<u8>> {
    serde_json::to_vec(request).map_err(ProtocolError::Encode)
}
