//! Panel command: replay a HAR capture into an interactive panel

use crate::capture::{self, CaptureBuffer};
use crate::clipboard::SystemClipboard;
use crate::config::{Config, FileStore};
use crate::settings::SettingsStore;
use crate::tui;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for the panel command
pub struct PanelOptions {
    pub har: PathBuf,
    pub pace_ms: Option<u64>,
}

/// Run the panel command
pub async fn run(opts: PanelOptions) -> Result<()> {
    let config = Config::load()?;
    let exchanges = capture::load_har(&opts.har)?;
    tracing::info!(
        "Loaded {} exchanges from {}",
        exchanges.len(),
        opts.har.display()
    );

    let store = SettingsStore::new(Arc::new(FileStore::open_default()?));
    let clipboard = Arc::new(SystemClipboard::new(config.clipboard_command.clone()));

    let (handle, buffer_task) = CaptureBuffer::spawn(config.live_feed_capacity);
    let pace = Duration::from_millis(opts.pace_ms.unwrap_or(config.pace_ms));
    let observer = capture::spawn_observer(exchanges, handle.clone(), pace);

    let result = tui::run(handle, store, clipboard).await;

    // Closing the page ends the session and drops its capture
    observer.abort();
    let _ = observer.await;
    let _ = buffer_task.await;
    tracing::info!("Panel session closed");

    result
}
