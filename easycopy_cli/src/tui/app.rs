//! TUI application state and event handling

use crate::panel::PanelView;
use crate::settings::{CopySettings, SettingsForm};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use easycopy_common::constants::{COPY_ACK_MESSAGE, COPY_ACK_MILLIS};
use easycopy_common::CapturedExchange;
use std::time::{Duration, Instant};

/// Panel tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Requests,
    Settings,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Requests => "Requests",
            Tab::Settings => "Settings",
        }
    }

    fn next(&self) -> Self {
        match self {
            Tab::Requests => Tab::Settings,
            Tab::Settings => Tab::Requests,
        }
    }
}

/// Transient acknowledgment shown next to a copied exchange
#[derive(Debug, Clone)]
pub struct Tooltip {
    pub message: String,
    /// History index of the copied exchange
    pub index: usize,
    shown_at: Instant,
}

impl Tooltip {
    pub fn new(index: usize, now: Instant) -> Self {
        Self {
            message: COPY_ACK_MESSAGE.to_string(),
            index,
            shown_at: now,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= Duration::from_millis(COPY_ACK_MILLIS)
    }
}

/// Events that can be sent to the TUI
#[derive(Debug)]
pub enum PanelEvent {
    /// Backlog arrived over the relay port
    Replayed(Vec<CapturedExchange>),
    /// Exchange captured after the backlog
    Exchange(CapturedExchange),
    /// The backlog handshake failed
    ReplayFailed(String),
    /// A copy finished for the exchange at this history index
    Copied { index: usize, ok: bool },
    /// Key event from terminal
    Key(KeyEvent),
    /// Tick for periodic updates
    Tick,
}

/// Work the event loop has to perform on behalf of the app
#[derive(Debug)]
pub enum PanelAction {
    Copy {
        index: usize,
        exchange: CapturedExchange,
    },
    SaveSettings(CopySettings),
}

/// TUI application state
pub struct PanelApp {
    pub tab: Tab,
    pub view: PanelView,
    pub form: SettingsForm,
    pub tooltip: Option<Tooltip>,
    pub status: Option<String>,
    pub replayed: bool,
    pub should_quit: bool,
}

impl PanelApp {
    pub fn new(settings: CopySettings) -> Self {
        Self {
            tab: Tab::Requests,
            view: PanelView::new(),
            form: SettingsForm::new(settings),
            tooltip: None,
            status: None,
            replayed: false,
            should_quit: false,
        }
    }

    /// Record the outcome of a settings save
    pub fn settings_saved(&mut self, result: anyhow::Result<()>) {
        self.status = Some(match result {
            Ok(()) => "Settings saved.".to_string(),
            Err(e) => format!("Failed to save settings: {:#}", e),
        });
    }

    fn handle_requests_key(&mut self, key: KeyEvent) -> Option<PanelAction> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.view.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.view.select_next(),
            KeyCode::Home => self.view.select_first(),
            KeyCode::End => self.view.select_last(),
            KeyCode::Char('e') => self.view.toggle_errors_only(),
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('c') => {
                let index = self.view.selected_index()?;
                return self
                    .view
                    .selected_exchange()
                    .cloned()
                    .map(|exchange| PanelAction::Copy { index, exchange });
            }
            _ => {}
        }
        None
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Option<PanelAction> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.form.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.form.select_next(),
            KeyCode::Enter | KeyCode::Char(' ') => self.form.toggle_selected(),
            KeyCode::Char('r') => {
                self.form.reset();
                self.status = None;
            }
            KeyCode::Char('s') => return Some(PanelAction::SaveSettings(self.form.settings())),
            _ => {}
        }
        None
    }

    /// Handle key events
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<PanelAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) => {
                self.should_quit = true;
                None
            }
            (KeyCode::Tab, _) | (KeyCode::BackTab, _) | (KeyCode::Left, _) | (KeyCode::Right, _) => {
                self.tab = self.tab.next();
                self.status = None;
                None
            }
            _ => match self.tab {
                Tab::Requests => self.handle_requests_key(key),
                Tab::Settings => self.handle_settings_key(key),
            },
        }
    }

    /// Drop the tooltip once it has been up long enough
    pub fn expire_tooltip(&mut self, now: Instant) {
        if self.tooltip.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.tooltip = None;
        }
    }

    /// Handle TUI event
    pub fn handle_event(&mut self, event: PanelEvent) -> Option<PanelAction> {
        match event {
            PanelEvent::Replayed(backlog) => {
                self.view.load_backlog(backlog);
                self.replayed = true;
            }
            PanelEvent::Exchange(exchange) => {
                self.view.push_live(exchange);
            }
            PanelEvent::ReplayFailed(reason) => {
                self.status = Some(format!("Could not load captured requests: {}", reason));
            }
            PanelEvent::Copied { index, ok } => {
                if ok {
                    self.tooltip = Some(Tooltip::new(index, Instant::now()));
                }
            }
            PanelEvent::Key(key) => return self.handle_key(key),
            PanelEvent::Tick => self.expire_tooltip(Instant::now()),
        }
        None
    }
}
