//! Copy payload for a single exchange
//!
//! The response body is only reachable through the exchange's content
//! handle. The body is fetched once and stored, then fetched again; the
//! second delivery overwrites it and its callback is where the JSON text is
//! built and emitted. Whatever that last delivery carries is what ends up on
//! the clipboard.

use crate::clipboard::Clipboard;
use crate::settings::{CopySettings, SettingsStore};
use easycopy_common::{CapturedExchange, Header};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Copy errors
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Response body fetch ended without delivering content")]
    ContentDropped,

    #[error("Failed to serialize request details: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Selected fields of one exchange, in payload order
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<Vec<Header>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Vec<Header>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

impl CopyDetails {
    /// Everything except the response body, which needs a fetch
    pub fn from_exchange(exchange: &CapturedExchange, settings: &CopySettings) -> Self {
        Self {
            url: settings.url.then(|| exchange.url.clone()),
            method: settings.method.then(|| exchange.method.clone()),
            request_headers: settings
                .request_headers
                .then(|| exchange.request_headers.clone()),
            request_body: if settings.request_body {
                exchange.request_body.clone()
            } else {
                None
            },
            status: settings.status.then_some(exchange.status),
            status_text: settings.status_text.then(|| exchange.status_text.clone()),
            response_headers: settings
                .response_headers
                .then(|| exchange.response_headers.clone()),
            response_body: None,
        }
    }

    /// Indented JSON text
    pub fn to_text(&self) -> Result<String, CopyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

async fn fetch_content(exchange: &CapturedExchange) -> Option<String> {
    let (tx, rx) = oneshot::channel();
    exchange.get_content(Box::new(move |content, _encoding| {
        let _ = tx.send(content);
    }));
    rx.await.ok()
}

/// Build the copy payload for `exchange` under `settings`
pub async fn serialize(
    exchange: &CapturedExchange,
    settings: &CopySettings,
) -> Result<String, CopyError> {
    let mut details = CopyDetails::from_exchange(exchange, settings);
    let include_body = settings.response_body;

    if include_body {
        match fetch_content(exchange).await {
            Some(content) => details.response_body = Some(content),
            None => tracing::error!("Failed to retrieve response body: {}", CopyError::ContentDropped),
        }
    }

    let (emit_tx, emit_rx) = oneshot::channel();
    exchange.get_content(Box::new(move |content, _encoding| {
        if include_body {
            details.response_body = Some(content);
        }
        let _ = emit_tx.send(details.to_text());
    }));

    emit_rx.await.map_err(|_| CopyError::ContentDropped)?
}

/// Serialize `exchange` with the stored settings and put it on the clipboard.
///
/// Clipboard failures are logged and do not fail the copy; the returned text
/// is the payload either way.
pub async fn copy_request_details(
    exchange: &CapturedExchange,
    settings: &SettingsStore,
    clipboard: Arc<dyn Clipboard>,
) -> Result<String, CopyError> {
    let settings = settings.load().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default copy settings: {:#}", e);
        CopySettings::default()
    });

    let text = serialize(exchange, &settings).await?;

    let payload = text.clone();
    match tokio::task::spawn_blocking(move || clipboard.write_text(&payload)).await {
        Ok(Ok(())) => tracing::debug!("Copied {} bytes to clipboard", text.len()),
        Ok(Err(e)) => tracing::error!("Failed to copy text: {}", e),
        Err(e) => tracing::error!("Clipboard task failed: {}", e),
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardError, MemoryClipboard};
    use crate::config::MemoryStore;
    use crate::settings::CopyField;
    use easycopy_common::{ContentCallback, ContentHandle, ContentSource, InlineContent};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Delivers a different body on each fetch
    struct SequencedContent {
        calls: AtomicUsize,
        bodies: Vec<&'static str>,
    }

    impl ContentSource for SequencedContent {
        fn get_content(&self, callback: ContentCallback) {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.bodies[n.min(self.bodies.len() - 1)].to_string();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                callback(body, None);
            });
        }
    }

    /// Drops the callback of the listed calls without invoking it
    struct DroppingContent {
        calls: AtomicUsize,
        drop_calls: Vec<usize>,
    }

    impl ContentSource for DroppingContent {
        fn get_content(&self, callback: ContentCallback) {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.drop_calls.contains(&n) {
                callback("late".to_string(), None);
            }
        }
    }

    struct FailingClipboard {
        attempts: Mutex<usize>,
    }

    impl Clipboard for FailingClipboard {
        fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
            *self.attempts.lock().unwrap() += 1;
            Err(ClipboardError::Unavailable)
        }
    }

    fn sample() -> CapturedExchange {
        CapturedExchange::new("POST", "https://a.test/api", 500, "Internal Server Error")
            .with_request_headers(vec![Header::new("Accept", "application/json")])
            .with_response_headers(vec![Header::new("Content-Type", "text/plain")])
            .with_request_body("{\"id\":1}")
            .with_content(ContentHandle::new(InlineContent::new("oops")))
    }

    fn all_fields() -> CopySettings {
        let mut settings = CopySettings::default();
        for field in CopyField::ALL {
            settings.set(field, true);
        }
        settings
    }

    fn keys(text: &str) -> Vec<String> {
        let value: Value = serde_json::from_str(text).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[tokio::test]
    async fn test_default_settings_scenario() {
        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK");
        let text = serialize(&exchange, &CopySettings::default()).await.unwrap();

        assert_eq!(
            text,
            "{\n  \"url\": \"https://a.test/x\",\n  \"method\": \"GET\",\n  \"status\": 200,\n  \"responseBody\": \"\"\n}"
        );
    }

    #[tokio::test]
    async fn test_all_fields_in_canonical_order() {
        let text = serialize(&sample(), &all_fields()).await.unwrap();
        assert_eq!(
            keys_in_text_order(&text),
            vec![
                "url",
                "method",
                "requestHeaders",
                "requestBody",
                "status",
                "statusText",
                "responseHeaders",
                "responseBody"
            ]
        );

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["requestHeaders"][0]["name"], "Accept");
        assert_eq!(value["requestBody"], "{\"id\":1}");
        assert_eq!(value["statusText"], "Internal Server Error");
        assert_eq!(value["responseBody"], "oops");
    }

    #[tokio::test]
    async fn test_field_included_iff_flag_set() {
        for field in CopyField::ALL {
            let mut only = CopySettings {
                url: false,
                method: false,
                request_headers: false,
                request_body: false,
                status: false,
                status_text: false,
                response_headers: false,
                response_body: false,
            };
            only.set(field, true);
            let text = serialize(&sample(), &only).await.unwrap();
            assert_eq!(keys(&text), vec![field.as_str().to_string()], "only {}", field);

            let mut all_but = all_fields();
            all_but.set(field, false);
            let text = serialize(&sample(), &all_but).await.unwrap();
            assert!(!keys(&text).contains(&field.as_str().to_string()), "all but {}", field);
            assert_eq!(keys(&text).len(), 7);
        }
    }

    #[tokio::test]
    async fn test_absent_request_body_is_omitted() {
        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK");
        let text = serialize(&exchange, &all_fields()).await.unwrap();
        assert!(!keys(&text).contains(&"requestBody".to_string()));
    }

    #[tokio::test]
    async fn test_emitted_body_comes_from_second_fetch() {
        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK").with_content(
            ContentHandle::new(SequencedContent {
                calls: AtomicUsize::new(0),
                bodies: vec!["first", "second"],
            }),
        );

        let text = serialize(&exchange, &CopySettings::default()).await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["responseBody"], "second");
    }

    #[tokio::test]
    async fn test_body_fetched_twice_only_when_selected() {
        let content = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        impl ContentSource for Counting {
            fn get_content(&self, callback: ContentCallback) {
                self.0.fetch_add(1, Ordering::SeqCst);
                callback(String::new(), None);
            }
        }

        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK")
            .with_content(ContentHandle::new(Counting(content.clone())));

        serialize(&exchange, &CopySettings::default()).await.unwrap();
        assert_eq!(content.load(Ordering::SeqCst), 2);

        let no_body = CopySettings {
            response_body: false,
            ..CopySettings::default()
        };
        let text = serialize(&exchange, &no_body).await.unwrap();
        assert_eq!(content.load(Ordering::SeqCst), 3);
        assert!(!keys(&text).contains(&"responseBody".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_first_fetch_is_not_fatal() {
        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK").with_content(
            ContentHandle::new(DroppingContent {
                calls: AtomicUsize::new(0),
                drop_calls: vec![0],
            }),
        );

        let text = serialize(&exchange, &CopySettings::default()).await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["responseBody"], "late");
    }

    #[tokio::test]
    async fn test_dropped_emitting_fetch_fails_the_copy() {
        let exchange = CapturedExchange::new("GET", "https://a.test/x", 200, "OK").with_content(
            ContentHandle::new(DroppingContent {
                calls: AtomicUsize::new(0),
                drop_calls: vec![1],
            }),
        );

        assert!(matches!(
            serialize(&exchange, &CopySettings::default()).await,
            Err(CopyError::ContentDropped)
        ));
    }

    #[tokio::test]
    async fn test_copy_uses_stored_settings() {
        let store = SettingsStore::new(Arc::new(MemoryStore::new()));
        store
            .save(&CopySettings {
                url: true,
                method: false,
                request_headers: false,
                request_body: false,
                status: false,
                status_text: false,
                response_headers: false,
                response_body: false,
            })
            .unwrap();

        let clipboard = Arc::new(MemoryClipboard::new());
        let text = copy_request_details(&sample(), &store, clipboard.clone())
            .await
            .unwrap();

        assert_eq!(text, "{\n  \"url\": \"https://a.test/api\"\n}");
        assert_eq!(clipboard.writes(), vec![text]);
    }

    #[tokio::test]
    async fn test_clipboard_failure_still_returns_payload() {
        let store = SettingsStore::new(Arc::new(MemoryStore::new()));
        let clipboard = Arc::new(FailingClipboard {
            attempts: Mutex::new(0),
        });

        let text = copy_request_details(&sample(), &store, clipboard.clone())
            .await
            .unwrap();

        assert!(text.contains("\"responseBody\": \"oops\""));
        assert_eq!(*clipboard.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_settings_fall_back_to_defaults() {
        let kv = Arc::new(MemoryStore::new());
        crate::config::KeyValueStore::set(
            kv.as_ref(),
            easycopy_common::constants::SETTINGS_KEY,
            serde_json::json!(42),
        )
        .unwrap();
        let store = SettingsStore::new(kv);

        let text = copy_request_details(&sample(), &store, Arc::new(MemoryClipboard::new()))
            .await
            .unwrap();
        assert_eq!(
            keys_in_text_order(&text),
            vec!["url", "method", "requestBody", "status", "responseBody"]
        );
    }

    /// Top-level keys in the order they appear in the text
    fn keys_in_text_order(text: &str) -> Vec<String> {
        text.lines()
            .filter(|line| line.starts_with("  \""))
            .filter_map(|line| line.trim_start().split('"').nth(1).map(str::to_string))
            .collect()
    }
}
