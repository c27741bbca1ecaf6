//! Terminal User Interface for the Easy Copy panel

mod app;
mod ui;

use app::{PanelAction, PanelApp, PanelEvent};
use ui::draw;

use crate::capture::CaptureHandle;
use crate::clipboard::Clipboard;
use crate::panel;
use crate::serializer;
use crate::settings::{CopySettings, SettingsStore};
use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Open the panel in the terminal until the user quits
pub async fn run(
    handle: CaptureHandle,
    store: SettingsStore,
    clipboard: Arc<dyn Clipboard>,
) -> Result<()> {
    let settings = store.load().unwrap_or_else(|e| {
        tracing::warn!("Could not load copy settings, using defaults: {:#}", e);
        CopySettings::default()
    });
    let mut app = PanelApp::new(settings);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channel for panel events
    let (event_tx, event_rx) = mpsc::channel::<PanelEvent>(256);

    // Activate in the background so the first frame doesn't wait on the handshake
    let feed_tx = event_tx.clone();
    let feed_task = tokio::spawn(async move {
        let mut feed = match panel::activate(&handle).await {
            Ok((backlog, feed)) => {
                if feed_tx.send(PanelEvent::Replayed(backlog)).await.is_err() {
                    return;
                }
                feed
            }
            Err(e) => {
                tracing::error!("Panel activation failed: {}", e);
                let _ = feed_tx.send(PanelEvent::ReplayFailed(e.to_string())).await;
                return;
            }
        };

        while let Some(exchange) = feed.next().await {
            if feed_tx.send(PanelEvent::Exchange(exchange)).await.is_err() {
                break;
            }
        }
        tracing::debug!("Live feed ended");
    });

    // Run event loop
    let result = run_loop(&mut terminal, &mut app, &store, clipboard, event_tx, event_rx).await;
    feed_task.abort();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut PanelApp,
    store: &SettingsStore,
    clipboard: Arc<dyn Clipboard>,
    event_tx: mpsc::Sender<PanelEvent>,
    mut event_rx: mpsc::Receiver<PanelEvent>,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(100));

    loop {
        terminal.draw(|f| draw(f, app))?;

        let action = tokio::select! {
            // Keyboard events (non-blocking)
            _ = tick_interval.tick() => {
                let mut action = app.handle_event(PanelEvent::Tick);
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        action = app.handle_event(PanelEvent::Key(key));
                    }
                }
                action
            }

            Some(event) = event_rx.recv() => app.handle_event(event),
        };

        if app.should_quit {
            return Ok(());
        }

        match action {
            Some(PanelAction::Copy { index, exchange }) => {
                let store = store.clone();
                let clipboard = clipboard.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    let ok = match serializer::copy_request_details(&exchange, &store, clipboard).await {
                        Ok(_) => true,
                        Err(e) => {
                            tracing::error!("Failed to copy request details: {}", e);
                            false
                        }
                    };
                    let _ = tx.send(PanelEvent::Copied { index, ok }).await;
                });
            }
            Some(PanelAction::SaveSettings(settings)) => {
                app.settings_saved(store.save(&settings));
            }
            None => {}
        }
    }
}
