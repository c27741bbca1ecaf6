//! HAR-backed network observer
//!
//! Loads a HAR 1.2 capture and feeds its entries to the capture buffer as
//! finished exchanges, one at a time, the way a live page would produce them.

use super::buffer::CaptureHandle;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use easycopy_common::{CapturedExchange, ContentCallback, ContentHandle, ContentSource, Header};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct Har {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarEntry {
    #[serde(default)]
    started_date_time: Option<DateTime<Utc>>,
    request: HarRequest,
    response: HarResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    post_data: Option<HarPostData>,
}

#[derive(Debug, Deserialize)]
struct HarPostData {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarResponse {
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    content: HarContent,
}

#[derive(Debug, Default, Deserialize)]
struct HarContent {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Response content from a HAR entry, delivered on a later scheduler turn
pub struct HarBody {
    text: String,
    encoding: Option<String>,
}

impl ContentSource for HarBody {
    fn get_content(&self, callback: ContentCallback) {
        let text = self.text.clone();
        let encoding = self.encoding.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::task::yield_now().await;
                    callback(text, encoding);
                });
            }
            Err(_) => callback(text, encoding),
        }
    }
}

impl HarEntry {
    fn into_exchange(self) -> CapturedExchange {
        let body = HarBody {
            text: self.response.content.text.unwrap_or_default(),
            encoding: self.response.content.encoding,
        };

        let mut exchange = CapturedExchange::new(
            self.request.method,
            self.request.url,
            self.response.status,
            self.response.status_text,
        )
        .with_request_headers(self.request.headers)
        .with_response_headers(self.response.headers)
        .with_content(ContentHandle::new(body));

        if let Some(started) = self.started_date_time {
            exchange = exchange.with_started_date_time(started);
        }
        if let Some(text) = self.request.post_data.and_then(|p| p.text) {
            exchange = exchange.with_request_body(text);
        }
        exchange
    }
}

/// Parse HAR JSON into exchanges in file order
pub fn parse_har(content: &str) -> Result<Vec<CapturedExchange>> {
    let har: Har = serde_json::from_str(content).context("Failed to parse HAR file")?;
    Ok(har.log.entries.into_iter().map(HarEntry::into_exchange).collect())
}

/// Load a HAR file from disk
pub fn load_har(path: &Path) -> Result<Vec<CapturedExchange>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read HAR file {}", path.display()))?;
    parse_har(&content)
}

/// Feed exchanges to the capture buffer, waiting `pace` before each one
pub fn spawn_observer(
    exchanges: Vec<CapturedExchange>,
    handle: CaptureHandle,
    pace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let total = exchanges.len();
        for exchange in exchanges {
            if !pace.is_zero() {
                tokio::time::sleep(pace).await;
            }
            handle.on_exchange_finished(exchange);
        }
        tracing::info!("Network feed finished after {} exchanges", total);
    })
}
