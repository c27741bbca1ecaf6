//! Relay port between the capture buffer and a panel
//!
//! A panel opens a named port, asks for the backlog once with
//! `getNetworkRequests`, and gets exactly one `networkRequests` reply.
//! Anything captured later reaches the panel through the live feed, not
//! through the port.

use crate::capture::{CaptureHandle, WeakCaptureHandle};
use easycopy_common::constants::PANEL_PORT_NAME;
use easycopy_common::RelayMessage;
use thiserror::Error;
use tokio::sync::mpsc;

/// Relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Capture buffer is no longer running")]
    BufferClosed,

    #[error("Relay port closed before the backlog arrived")]
    PortClosed,
}

/// Panel side of a relay port
pub struct PanelPort {
    tx: mpsc::UnboundedSender<RelayMessage>,
    rx: mpsc::UnboundedReceiver<RelayMessage>,
}

impl PanelPort {
    pub fn post_message(&self, message: RelayMessage) -> Result<(), RelayError> {
        self.tx.send(message).map_err(|_| RelayError::PortClosed)
    }

    /// Next message from the buffer, or `None` once the port is closed
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        self.rx.recv().await
    }
}

/// Buffer side of a relay port
struct BufferPort {
    rx: mpsc::UnboundedReceiver<RelayMessage>,
    tx: mpsc::UnboundedSender<RelayMessage>,
}

/// Open a port to the capture buffer
pub fn connect(handle: &CaptureHandle, name: &str) -> PanelPort {
    let (panel_tx, buffer_rx) = mpsc::unbounded_channel();
    let (buffer_tx, panel_rx) = mpsc::unbounded_channel();

    let port = BufferPort {
        rx: buffer_rx,
        tx: buffer_tx,
    };
    tokio::spawn(serve_port(name.to_string(), handle.downgrade(), port));

    PanelPort {
        tx: panel_tx,
        rx: panel_rx,
    }
}

async fn serve_port(name: String, handle: WeakCaptureHandle, mut port: BufferPort) {
    if name != PANEL_PORT_NAME {
        tracing::warn!("Refusing relay port with unexpected name `{}`", name);
        return;
    }

    while let Some(message) = port.rx.recv().await {
        match message {
            RelayMessage::GetNetworkRequests => {
                let data = match handle.replay_backlog().await {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::warn!("Cannot answer backlog request: {}", e);
                        return;
                    }
                };

                let count = data.len();
                if port.tx.send(RelayMessage::NetworkRequests { data }).is_err() {
                    tracing::debug!("Panel went away before the backlog reply, dropping it");
                    return;
                }
                tracing::debug!("Replayed {} exchanges to panel", count);
            }
            RelayMessage::NetworkRequests { .. } => {
                tracing::debug!("Ignoring networkRequests sent by a panel");
            }
        }
    }

    tracing::debug!("Relay port `{}` closed", name);
}
