//! Gateway abstraction for the remote file-service.

use crate::error::{SyncError, SyncResult};
use fsf_protocol::{Event, EventType, FileInfo};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A gateway handles communication with the file-service.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-memory for testing, etc.).
pub trait EventGateway: Send + Sync {
    /// Polls at most `limit` events with an id greater than `after_event_id`.
    fn poll_events(&self, after_event_id: u64, limit: u32) -> SyncResult<Vec<Event>>;

    /// Fetches the current metadata of a file.
    ///
    /// Returns `None` when the file-service has no record for the key.
    fn fetch_file_info(&self, file_key: &str) -> SyncResult<Option<FileInfo>>;

    /// Streams the full content of a file into `out`, returning the number of
    /// bytes written.
    fn download_file(&self, file_key: &str, out: &mut dyn Write) -> SyncResult<u64>;
}

impl<G: EventGateway + ?Sized> EventGateway for Arc<G> {
    fn poll_events(&self, after_event_id: u64, limit: u32) -> SyncResult<Vec<Event>> {
        (**self).poll_events(after_event_id, limit)
    }

    fn fetch_file_info(&self, file_key: &str) -> SyncResult<Option<FileInfo>> {
        (**self).fetch_file_info(file_key)
    }

    fn download_file(&self, file_key: &str, out: &mut dyn Write) -> SyncResult<u64> {
        (**self).download_file(file_key, out)
    }
}

#[derive(Debug, Clone)]
struct RemoteFile {
    info: FileInfo,
    content: Vec<u8>,
}

/// An in-memory file-service for testing.
///
/// Holds an event log and a file table, and records the offsets it was polled
/// with. Failures can be injected per file key.
#[derive(Debug)]
pub struct MemoryGateway {
    connected: AtomicBool,
    events: RwLock<Vec<Event>>,
    files: RwLock<HashMap<String, RemoteFile>>,
    failing_downloads: RwLock<HashSet<String>>,
    failing_info: RwLock<HashSet<String>>,
    poll_offsets: Mutex<Vec<u64>>,
    requests: AtomicUsize,
}

impl MemoryGateway {
    /// Creates an empty, connected gateway.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            events: RwLock::new(Vec::new()),
            files: RwLock::new(HashMap::new()),
            failing_downloads: RwLock::new(HashSet::new()),
            failing_info: RwLock::new(HashSet::new()),
            poll_offsets: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
        }
    }

    /// Appends an event to the log.
    pub fn push_event(&self, event: Event) {
        self.events.write().push(event);
    }

    /// Stores a regular file without publishing an event.
    pub fn put_file(&self, file_key: impl Into<String>, content: impl Into<Vec<u8>>) {
        let content = content.into();
        let info = FileInfo::file("file", content.len() as i64);
        self.files
            .write()
            .insert(file_key.into(), RemoteFile { info, content });
    }

    /// Stores a directory without publishing an event.
    pub fn put_dir(&self, file_key: impl Into<String>) {
        self.files.write().insert(
            file_key.into(),
            RemoteFile {
                info: FileInfo::dir("dir"),
                content: Vec::new(),
            },
        );
    }

    /// Stores a regular file and publishes an `Added` event for it.
    pub fn upload(&self, event_id: u64, file_key: &str, content: impl Into<Vec<u8>>) {
        self.put_file(file_key, content);
        self.push_event(Event::added(event_id, file_key));
    }

    /// Marks a file deleted (keeping its record) and publishes a `Deleted` event.
    pub fn delete(&self, event_id: u64, file_key: &str) {
        if let Some(file) = self.files.write().get_mut(file_key) {
            file.info.is_deleted = Some(true);
        }
        self.push_event(Event::new(event_id, EventType::Deleted, file_key));
    }

    /// Drops the record of a file entirely.
    pub fn purge(&self, file_key: &str) {
        self.files.write().remove(file_key);
    }

    /// Makes downloads of `file_key` write a partial body and then fail.
    pub fn fail_downloads(&self, file_key: impl Into<String>) {
        self.failing_downloads.write().insert(file_key.into());
    }

    /// Makes metadata requests for `file_key` fail.
    pub fn fail_file_info(&self, file_key: impl Into<String>) {
        self.failing_info.write().insert(file_key.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failing_downloads.write().clear();
        self.failing_info.write().clear();
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Offsets of every poll received so far.
    pub fn poll_offsets(&self) -> Vec<u64> {
        self.poll_offsets.lock().clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin_request(&self) -> SyncResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        Ok(())
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGateway for MemoryGateway {
    fn poll_events(&self, after_event_id: u64, limit: u32) -> SyncResult<Vec<Event>> {
        self.begin_request()?;
        self.poll_offsets.lock().push(after_event_id);

        let mut events: Vec<Event> = self
            .events
            .read()
            .iter()
            .filter(|e| e.event_id > after_event_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_id);
        events.truncate(limit as usize);
        Ok(events)
    }

    fn fetch_file_info(&self, file_key: &str) -> SyncResult<Option<FileInfo>> {
        self.begin_request()?;
        if self.failing_info.read().contains(file_key) {
            return Err(SyncError::transport_retryable(format!(
                "file info unavailable for {file_key}"
            )));
        }
        Ok(self.files.read().get(file_key).map(|f| f.info.clone()))
    }

    fn download_file(&self, file_key: &str, out: &mut dyn Write) -> SyncResult<u64> {
        self.begin_request()?;
        let content = self
            .files
            .read()
            .get(file_key)
            .map(|f| f.content.clone())
            .ok_or_else(|| SyncError::transport_retryable(format!("no such file {file_key}")))?;

        if self.failing_downloads.read().contains(file_key) {
            let partial = &content[..content.len() / 2];
            out.write_all(partial)
                .map_err(|e| SyncError::transport_retryable(e.to_string()))?;
            return Err(SyncError::transport_retryable(format!(
                "connection reset while downloading {file_key}"
            )));
        }

        out.write_all(&content)
            .map_err(|e| SyncError::transport_retryable(e.to_string()))?;
        Ok(content.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_respects_offset_and_limit() {
        let gateway = MemoryGateway::new();
        for id in 1..=5 {
            gateway.push_event(Event::added(id, format!("k{id}")));
        }

        let events = gateway.poll_events(2, 2).unwrap();
        let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(gateway.poll_offsets(), vec![2]);
    }

    #[test]
    fn file_info_and_download() {
        let gateway = MemoryGateway::new();
        gateway.upload(1, "k1", b"hello".to_vec());

        let info = gateway.fetch_file_info("k1").unwrap().unwrap();
        assert_eq!(info.size_in_bytes, Some(5));

        let mut out = Vec::new();
        assert_eq!(gateway.download_file("k1", &mut out).unwrap(), 5);
        assert_eq!(out, b"hello");

        gateway.purge("k1");
        assert!(gateway.fetch_file_info("k1").unwrap().is_none());
    }

    #[test]
    fn failing_download_writes_partial_body() {
        let gateway = MemoryGateway::new();
        gateway.put_file("k1", b"abcdef".to_vec());
        gateway.fail_downloads("k1");

        let mut out = Vec::new();
        assert!(gateway.download_file("k1", &mut out).is_err());
        assert_eq!(out, b"abc");
    }

    #[test]
    fn not_connected_error() {
        let gateway = MemoryGateway::new();
        gateway.set_connected(false);
        assert!(matches!(
            gateway.poll_events(0, 30),
            Err(SyncError::NotConnected)
        ));
        assert_eq!(gateway.request_count(), 1);
    }
}
