//! Copy settings: which exchange fields go into the clipboard payload

use crate::config::KeyValueStore;
use anyhow::{Context, Result};
use easycopy_common::constants::SETTINGS_KEY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A field that can be included in the copy payload, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyField {
    Url,
    Method,
    RequestHeaders,
    RequestBody,
    Status,
    StatusText,
    ResponseHeaders,
    ResponseBody,
}

impl CopyField {
    pub const ALL: [CopyField; 8] = [
        CopyField::Url,
        CopyField::Method,
        CopyField::RequestHeaders,
        CopyField::RequestBody,
        CopyField::Status,
        CopyField::StatusText,
        CopyField::ResponseHeaders,
        CopyField::ResponseBody,
    ];

    /// Key used in persisted settings and in the copy payload
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyField::Url => "url",
            CopyField::Method => "method",
            CopyField::RequestHeaders => "requestHeaders",
            CopyField::RequestBody => "requestBody",
            CopyField::Status => "status",
            CopyField::StatusText => "statusText",
            CopyField::ResponseHeaders => "responseHeaders",
            CopyField::ResponseBody => "responseBody",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CopyField::Url => "Request URL",
            CopyField::Method => "Request method",
            CopyField::RequestHeaders => "Request headers",
            CopyField::RequestBody => "Request body",
            CopyField::Status => "Response status",
            CopyField::StatusText => "Response status text",
            CopyField::ResponseHeaders => "Response headers",
            CopyField::ResponseBody => "Response body",
        }
    }
}

impl fmt::Display for CopyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CopyField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        CopyField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown field `{}`", s))
    }
}

/// Per-field inclusion flags for the copy payload.
///
/// Fields missing from a persisted mapping read as excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySettings {
    #[serde(default)]
    pub url: bool,
    #[serde(default)]
    pub method: bool,
    #[serde(default)]
    pub request_headers: bool,
    #[serde(default)]
    pub request_body: bool,
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub status_text: bool,
    #[serde(default)]
    pub response_headers: bool,
    #[serde(default)]
    pub response_body: bool,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            url: true,
            method: true,
            request_headers: false,
            request_body: true,
            status: true,
            status_text: false,
            response_headers: false,
            response_body: true,
        }
    }
}

impl CopySettings {
    pub fn get(&self, field: CopyField) -> bool {
        match field {
            CopyField::Url => self.url,
            CopyField::Method => self.method,
            CopyField::RequestHeaders => self.request_headers,
            CopyField::RequestBody => self.request_body,
            CopyField::Status => self.status,
            CopyField::StatusText => self.status_text,
            CopyField::ResponseHeaders => self.response_headers,
            CopyField::ResponseBody => self.response_body,
        }
    }

    pub fn set(&mut self, field: CopyField, included: bool) {
        let flag = match field {
            CopyField::Url => &mut self.url,
            CopyField::Method => &mut self.method,
            CopyField::RequestHeaders => &mut self.request_headers,
            CopyField::RequestBody => &mut self.request_body,
            CopyField::Status => &mut self.status,
            CopyField::StatusText => &mut self.status_text,
            CopyField::ResponseHeaders => &mut self.response_headers,
            CopyField::ResponseBody => &mut self.response_body,
        };
        *flag = included;
    }
}

/// Durable storage for [`CopySettings`]
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted settings, or the defaults if none were ever saved
    pub fn load(&self) -> Result<CopySettings> {
        match self.store.get(SETTINGS_KEY)? {
            Some(value) => serde_json::from_value(value).context("Failed to parse copy settings"),
            None => Ok(CopySettings::default()),
        }
    }

    /// Overwrite the persisted settings
    pub fn save(&self, settings: &CopySettings) -> Result<()> {
        let value = serde_json::to_value(settings).context("Failed to serialize copy settings")?;
        self.store.set(SETTINGS_KEY, value)?;
        tracing::info!("Settings saved.");
        Ok(())
    }
}

/// Editable form state for the settings tab.
///
/// Edits stay in memory until [`SettingsForm::settings`] is handed to
/// [`SettingsStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    values: CopySettings,
    selected: usize,
}

impl SettingsForm {
    pub fn new(values: CopySettings) -> Self {
        Self {
            values,
            selected: 0,
        }
    }

    pub fn settings(&self) -> CopySettings {
        self.values
    }

    pub fn set(&mut self, field: CopyField, included: bool) {
        self.values.set(field, included);
    }

    pub fn toggle(&mut self, field: CopyField) {
        let current = self.values.get(field);
        self.values.set(field, !current);
    }

    /// Put every field back to its default without persisting
    pub fn reset(&mut self) {
        self.values = CopySettings::default();
    }

    pub fn selected_field(&self) -> CopyField {
        CopyField::ALL[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(CopyField::ALL.len() - 1);
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn toggle_selected(&mut self) {
        self.toggle(self.selected_field());
    }
}
