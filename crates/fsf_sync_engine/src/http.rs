//! HTTP gateway implementation.
//!
//! This module provides an HTTP-based gateway to the file-service.
//! The actual HTTP client is abstracted via a trait so tests can answer
//! requests without a network; [`UreqClient`] is the production client.

use crate::config::GatewayConfig;
use crate::error::{SyncError, SyncResult};
use crate::gateway::EventGateway;
use fsf_protocol::{
    decode_response, encode_request, ApiResponse, Event, FileInfo, FileKeyRequest,
    PollEventsRequest, DOWNLOAD_FILE_PATH, FILE_INFO_PATH, POLL_EVENTS_PATH,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// A failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// Error message.
    pub message: String,
    /// Whether sending the same request later may succeed.
    pub retryable: bool,
}

impl HttpError {
    /// Creates an error from an HTTP status code.
    ///
    /// Client errors other than timeouts and rate limiting are not retryable.
    pub fn status(code: u16, url: &str) -> Self {
        Self {
            message: format!("HTTP {code} from {url}"),
            retryable: !(400..500).contains(&code) || code == 408 || code == 429,
        }
    }
}

impl From<String> for HttpError {
    fn from(message: String) -> Self {
        Self {
            message,
            retryable: true,
        }
    }
}

impl From<&str> for HttpError {
    fn from(message: &str) -> Self {
        message.to_string().into()
    }
}

impl From<HttpError> for SyncError {
    fn from(err: HttpError) -> Self {
        if err.retryable {
            SyncError::transport_retryable(err.message)
        } else {
            SyncError::transport_fatal(err.message)
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Non-2xx
/// responses must be reported as errors.
pub trait HttpClient: Send + Sync {
    /// Sends a JSON POST request and returns a reader over the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Box<dyn Read + Send>, HttpError>;
}

/// Blocking HTTP client built on `ureq`.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl HttpClient for UreqClient {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Box<dyn Read + Send>, HttpError> {
        match self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_bytes(&body)
        {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(ureq::Error::Status(code, _)) => Err(HttpError::status(code, url)),
            Err(e) => Err(e.to_string().into()),
        }
    }
}

/// HTTP-based file-service gateway.
///
/// Uses JSON request and response bodies and attaches the shared secret to
/// every request.
pub struct HttpGateway<C: HttpClient> {
    /// Base URL of the file-service, without a trailing slash.
    base_url: String,
    secret: Zeroizing<String>,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl HttpGateway<UreqClient> {
    /// Creates a gateway using the `ureq` client.
    pub fn connect(config: &GatewayConfig) -> SyncResult<Self> {
        Self::new(config, UreqClient::new(config.timeout))
    }
}

impl<C: HttpClient> HttpGateway<C> {
    /// Creates a new HTTP gateway.
    ///
    /// Fails with a configuration error when the base URL or the secret is
    /// missing; no request is sent in that case.
    pub fn new(config: &GatewayConfig, client: C) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            secret: config.secret.clone(),
            client,
            last_error: RwLock::new(None),
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn send<Req: Serialize>(&self, path: &str, request: &Req) -> SyncResult<Box<dyn Read + Send>> {
        let body = encode_request(request)?;
        let url = self.url(path);
        info!("Requesting: {}", url);

        let reader = self.client.post(&url, body).map_err(|e| {
            *self.last_error.write() = Some(e.message.clone());
            SyncError::from(e)
        })?;
        *self.last_error.write() = None;
        Ok(reader)
    }

    fn post_json<Req, Res>(&self, path: &str, request: &Req) -> SyncResult<Option<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let mut reader = self.send(path, request)?;
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| SyncError::transport_retryable(format!("failed to read response: {e}")))?;
        debug!(path, resp = %String::from_utf8_lossy(&body), "file-service response");

        let response: ApiResponse<Res> = decode_response(&body)?;
        Ok(response.into_data()?)
    }
}

impl<C: HttpClient> EventGateway for HttpGateway<C> {
    fn poll_events(&self, after_event_id: u64, limit: u32) -> SyncResult<Vec<Event>> {
        let request = PollEventsRequest::new(after_event_id, limit, self.secret.as_str());
        let events: Option<Vec<Event>> = self.post_json(POLL_EVENTS_PATH, &request)?;
        Ok(events.unwrap_or_default())
    }

    fn fetch_file_info(&self, file_key: &str) -> SyncResult<Option<FileInfo>> {
        let request = FileKeyRequest::new(file_key, self.secret.as_str());
        self.post_json(FILE_INFO_PATH, &request)
    }

    fn download_file(&self, file_key: &str, out: &mut dyn Write) -> SyncResult<u64> {
        let request = FileKeyRequest::new(file_key, self.secret.as_str());
        let mut reader = self.send(DOWNLOAD_FILE_PATH, &request)?;
        let written = io::copy(&mut reader, out).map_err(|e| {
            SyncError::transport_retryable(format!("failed to download {file_key}: {e}"))
        })?;
        info!(file_key, bytes = written, "Finished downloading file");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsf_protocol::{EventType, FileType};
    use parking_lot::Mutex;
    use std::io::Cursor;

    /// Answers every request with a fixed body and records what was sent.
    struct TestClient {
        response: RwLock<Result<Vec<u8>, HttpError>>,
        requests: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(Err("connection refused".into())),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_response(body: &[u8]) -> Self {
            let client = Self::new();
            *client.response.write() = Ok(body.to_vec());
            client
        }

        fn with_error(error: HttpError) -> Self {
            let client = Self::new();
            *client.response.write() = Err(error);
            client
        }
    }

    impl HttpClient for TestClient {
        fn post(&self, url: &str, body: Vec<u8>) -> Result<Box<dyn Read + Send>, HttpError> {
            let json = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
            self.requests.lock().push((url.to_string(), json));
            self.response
                .read()
                .clone()
                .map(|body| Box::new(Cursor::new(body)) as Box<dyn Read + Send>)
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig::new("http://fs.local:8080/", "s3cret")
    }

    #[test]
    fn missing_secret_fails_before_any_request() {
        let result = HttpGateway::new(
            &GatewayConfig::new("http://fs.local", ""),
            TestClient::new(),
        );
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn base_url_is_normalized() {
        let gateway = HttpGateway::new(&config(), TestClient::new()).unwrap();
        assert_eq!(gateway.base_url(), "http://fs.local:8080");
        assert_eq!(
            gateway.url("open/api/x"),
            "http://fs.local:8080/open/api/x"
        );
    }

    #[test]
    fn poll_events_sends_offset_limit_and_secret() {
        let client = TestClient::with_response(
            br#"{"error":false,"data":[{"eventId":4,"type":"UPLOADED","fileKey":"k4"}]}"#,
        );
        let gateway = HttpGateway::new(&config(), client).unwrap();

        let events = gateway.poll_events(3, 30).unwrap();
        assert_eq!(events, vec![Event::added(4, "k4")]);

        let requests = gateway.client.requests.lock();
        let (url, body) = &requests[0];
        assert_eq!(url, "http://fs.local:8080/open/api/sync/event/poll");
        assert_eq!(body["eventId"], 3);
        assert_eq!(body["limit"], 30);
        assert_eq!(body["secret"], "s3cret");
    }

    #[test]
    fn poll_events_without_data_is_empty() {
        let client = TestClient::with_response(br#"{"error":false}"#);
        let gateway = HttpGateway::new(&config(), client).unwrap();
        assert!(gateway.poll_events(0, 30).unwrap().is_empty());
    }

    #[test]
    fn fetch_file_info_absent_and_present() {
        let client = TestClient::with_response(br#"{"error":false,"data":null}"#);
        let gateway = HttpGateway::new(&config(), client).unwrap();
        assert!(gateway.fetch_file_info("gone").unwrap().is_none());

        let client = TestClient::with_response(
            br#"{"error":false,"data":{"name":"docs","fileType":"DIR"}}"#,
        );
        let gateway = HttpGateway::new(&config(), client).unwrap();
        let info = gateway.fetch_file_info("docs").unwrap().unwrap();
        assert_eq!(info.file_type, Some(FileType::Dir));

        let requests = gateway.client.requests.lock();
        assert_eq!(requests[0].1["fileKey"], "docs");
    }

    #[test]
    fn server_error_envelope() {
        let client =
            TestClient::with_response(br#"{"errorCode":"E403","msg":"bad secret","error":true}"#);
        let gateway = HttpGateway::new(&config(), client).unwrap();
        assert!(matches!(
            gateway.poll_events(0, 30),
            Err(SyncError::Server { ref code, .. }) if code == "E403"
        ));
    }

    #[test]
    fn malformed_response_is_protocol_error() {
        let client = TestClient::with_response(b"<html>502</html>");
        let gateway = HttpGateway::new(&config(), client).unwrap();
        assert!(matches!(
            gateway.fetch_file_info("k"),
            Err(SyncError::Protocol(_))
        ));
    }

    #[test]
    fn transport_failure_is_retryable_and_remembered() {
        let gateway = HttpGateway::new(&config(), TestClient::new()).unwrap();
        let err = gateway.poll_events(0, 30).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(gateway.last_error().as_deref(), Some("connection refused"));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for (code, retryable) in [(401, false), (404, false), (408, true), (429, true), (502, true)] {
            let client = TestClient::with_error(HttpError::status(code, "http://fs.local:8080/x"));
            let gateway = HttpGateway::new(&config(), client).unwrap();
            let err = gateway.poll_events(0, 30).unwrap_err();
            assert!(matches!(err, SyncError::Transport { .. }));
            assert_eq!(err.is_retryable(), retryable, "HTTP {code}");
            assert!(gateway.last_error().unwrap().contains(&code.to_string()));
        }
    }

    #[test]
    fn download_streams_body() {
        let client = TestClient::with_response(b"binary-content");
        let gateway = HttpGateway::new(&config(), client).unwrap();

        let mut out = Vec::new();
        assert_eq!(gateway.download_file("k1", &mut out).unwrap(), 14);
        assert_eq!(out, b"binary-content");

        let requests = gateway.client.requests.lock();
        assert!(requests[0].0.ends_with("/open/api/sync/file/download"));
    }

    #[test]
    fn unknown_event_types_pass_through() {
        let client = TestClient::with_response(
            br#"{"error":false,"data":[{"eventId":1,"type":"MOVED","fileKey":"k"}]}"#,
        );
        let gateway = HttpGateway::new(&config(), client).unwrap();
        let events = gateway.poll_events(0, 30).unwrap();
        assert_eq!(events[0].event_type, EventType::Unknown("MOVED".into()));
    }
}
