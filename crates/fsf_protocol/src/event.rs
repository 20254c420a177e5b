//! File events published by the file-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change a file event describes.
///
/// The file-service encodes the kind as a string. Strings this follower does
/// not know are kept in [`EventType::Unknown`] so they can be stored and
/// acknowledged without losing the original value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// A file or directory was uploaded (`"UPLOADED"`).
    Added,
    /// A file or directory was deleted (`"DELETED"`).
    Deleted,
    /// File metadata was updated (`"UPDATED"`).
    Updated,
    /// Any other event kind.
    Unknown(String),
}

impl EventType {
    /// Returns the wire string for this event type.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Added => "UPLOADED",
            EventType::Deleted => "DELETED",
            EventType::Updated => "UPDATED",
            EventType::Unknown(raw) => raw,
        }
    }

    /// Parses a wire string. Never fails; unrecognized values become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "UPLOADED" => EventType::Added,
            "DELETED" => EventType::Deleted,
            "UPDATED" => EventType::Updated,
            other => EventType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "UPLOADED" => EventType::Added,
            "DELETED" => EventType::Deleted,
            "UPDATED" => EventType::Updated,
            _ => EventType::Unknown(raw),
        }
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single entry of the file-service event log.
///
/// Event ids are assigned by the file-service and strictly increase; the
/// follower uses the largest id it has recorded as the offset of its next poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event id.
    pub event_id: u64,
    /// Kind of change.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Key of the affected file.
    pub file_key: String,
    /// When the file-service recorded the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates a new event.
    pub fn new(event_id: u64, event_type: EventType, file_key: impl Into<String>) -> Self {
        Self {
            event_id,
            event_type,
            file_key: file_key.into(),
            create_time: None,
        }
    }

    /// Creates an `Added` event.
    pub fn added(event_id: u64, file_key: impl Into<String>) -> Self {
        Self::new(event_id, EventType::Added, file_key)
    }

    /// Creates a `Deleted` event.
    pub fn deleted(event_id: u64, file_key: impl Into<String>) -> Self {
        Self::new(event_id, EventType::Deleted, file_key)
    }
}
