//! Easy Copy Common - Shared exchange model and relay protocol
//!
//! This crate contains the captured-exchange type and the messages exchanged
//! between the capture buffer and a panel over the relay port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to deserialize message: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// A single header as delivered by the network feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Callback receiving `(content, encoding)` from a body fetch
pub type ContentCallback = Box<dyn FnOnce(String, Option<String>) + Send + 'static>;

/// Native handle through which a response body can be fetched.
///
/// Every call to [`ContentSource::get_content`] is an independent completion:
/// the callback fires at most once, at some later point chosen by the source.
pub trait ContentSource: Send + Sync {
    fn get_content(&self, callback: ContentCallback);
}

/// Shared handle to an exchange's content source
#[derive(Clone)]
pub struct ContentHandle(Arc<dyn ContentSource>);

impl ContentHandle {
    pub fn new<S: ContentSource + 'static>(source: S) -> Self {
        Self(Arc::new(source))
    }

    /// Handle that always delivers an empty body
    pub fn empty() -> Self {
        Self::new(InlineContent::default())
    }

    pub fn get_content(&self, callback: ContentCallback) {
        self.0.get_content(callback);
    }
}

impl Default for ContentHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentHandle")
    }
}

/// Content already held in memory, delivered synchronously on each fetch
#[derive(Debug, Clone, Default)]
pub struct InlineContent {
    pub text: String,
    pub encoding: Option<String>,
}

impl InlineContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            encoding: None,
        }
    }
}

impl ContentSource for InlineContent {
    fn get_content(&self, callback: ContentCallback) {
        callback(self.text.clone(), self.encoding.clone());
    }
}

/// A finished HTTP(S) request/response pair observed during inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedExchange {
    /// When the request was started
    pub started_date_time: DateTime<Utc>,

    /// HTTP method (GET, POST, etc.)
    pub method: String,

    /// Full request URL
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// HTTP status text
    pub status_text: String,

    pub request_headers: Vec<Header>,

    pub response_headers: Vec<Header>,

    /// Request body text, present only if the request carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,

    /// Lazy response body; not part of the serialized form
    #[serde(skip)]
    content: ContentHandle,
}

impl CapturedExchange {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            started_date_time: Utc::now(),
            method: method.into(),
            url: url.into(),
            status,
            status_text: status_text.into(),
            request_headers: Vec::new(),
            response_headers: Vec::new(),
            request_body: None,
            content: ContentHandle::empty(),
        }
    }

    pub fn with_request_headers(mut self, headers: Vec<Header>) -> Self {
        self.request_headers = headers;
        self
    }

    pub fn with_response_headers(mut self, headers: Vec<Header>) -> Self {
        self.response_headers = headers;
        self
    }

    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    pub fn with_content(mut self, content: ContentHandle) -> Self {
        self.content = content;
        self
    }

    pub fn with_started_date_time(mut self, started: DateTime<Utc>) -> Self {
        self.started_date_time = started;
        self
    }

    /// Check if the response status is an HTTP error (4xx/5xx)
    pub fn is_error(&self) -> bool {
        self.status >= constants::ERROR_STATUS_THRESHOLD
    }

    /// Fetch the response body; see [`ContentSource::get_content`]
    pub fn get_content(&self, callback: ContentCallback) {
        self.content.get_content(callback);
    }
}

/// Messages exchanged over the relay port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RelayMessage {
    /// Sent by the panel once, right after the port opens
    #[serde(rename = "getNetworkRequests")]
    GetNetworkRequests,

    /// Reply carrying the backlog in capture order
    #[serde(rename = "networkRequests")]
    NetworkRequests { data: Vec<CapturedExchange> },
}

impl RelayMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Serialize)
    }

    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(s).map_err(ProtocolError::Deserialize)
    }
}

/// Constants for the protocol
pub mod constants {
    /// Name a panel must use when opening the relay port
    pub const PANEL_PORT_NAME: &str = "devtools-panel";

    /// Key under which copy settings are persisted
    pub const SETTINGS_KEY: &str = "copySettings";

    /// First status code treated as an error by the errors-only filter
    pub const ERROR_STATUS_THRESHOLD: u16 = 400;

    /// Tooltip shown after a successful copy
    pub const COPY_ACK_MESSAGE: &str = "Network request copied to clipboard";

    /// How long the copy tooltip stays on screen
    pub const COPY_ACK_MILLIS: u64 = 2000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_network_requests_wire_format() {
        let json = RelayMessage::GetNetworkRequests.to_json().unwrap();
        assert_eq!(json, r#"{"action":"getNetworkRequests"}"#);

        match RelayMessage::from_json(&json).unwrap() {
            RelayMessage::GetNetworkRequests => {}
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_network_requests_reply() {
        let exchange = CapturedExchange::new("POST", "https://a.test/api", 201, "Created")
            .with_request_headers(vec![Header::new("Content-Type", "application/json")])
            .with_request_body(r#"{"a":1}"#);

        let msg = RelayMessage::NetworkRequests {
            data: vec![exchange],
        };
        let json = msg.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["action"], "networkRequests");
        assert_eq!(value["data"][0]["method"], "POST");
        assert_eq!(value["data"][0]["statusText"], "Created");
        assert_eq!(value["data"][0]["requestHeaders"][0]["name"], "Content-Type");
        assert_eq!(value["data"][0]["requestBody"], r#"{"a":1}"#);
    }

    #[test]
    fn test_missing_request_body_is_omitted() {
        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK");
        let value = serde_json::to_value(&exchange).unwrap();
        assert!(value.get("requestBody").is_none());
    }

    #[test]
    fn test_deserialized_exchange_has_empty_content() {
        let json = r#"{"action":"networkRequests","data":[{
            "startedDateTime":"2024-01-01T00:00:00Z",
            "method":"GET","url":"https://a.test/x","status":404,"statusText":"Not Found",
            "requestHeaders":[],"responseHeaders":[]
        }]}"#;

        let data = match RelayMessage::from_json(json).unwrap() {
            RelayMessage::NetworkRequests { data } => data,
            _ => panic!("Wrong message type"),
        };
        assert!(data[0].is_error());

        let delivered = Arc::new(std::sync::Mutex::new(None));
        let sink = delivered.clone();
        data[0].get_content(Box::new(move |content, encoding| {
            *sink.lock().unwrap() = Some((content, encoding));
        }));
        assert_eq!(*delivered.lock().unwrap(), Some((String::new(), None)));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(RelayMessage::from_json(r#"{"action":"clear"}"#).is_err());
    }

    #[test]
    fn test_error_threshold() {
        assert!(!CapturedExchange::new("GET", "/", 399, "").is_error());
        assert!(CapturedExchange::new("GET", "/", 400, "").is_error());
        assert!(CapturedExchange::new("GET", "/", 503, "").is_error());
    }
}
