//! Panel activation: backlog handshake followed by the live feed

use crate::capture::{CaptureHandle, LiveExchange, WeakCaptureHandle};
use crate::relay::{self, PanelPort, RelayError};
use easycopy_common::constants::PANEL_PORT_NAME;
use easycopy_common::{CapturedExchange, RelayMessage};
use std::collections::VecDeque;
use tokio::sync::broadcast::{self, error::RecvError};

/// Live exchanges for an activated panel, starting right after its backlog
pub struct LiveFeed {
    live: broadcast::Receiver<LiveExchange>,
    next_seq: usize,
    buffer: WeakCaptureHandle,
    // Exchanges recovered from the backlog after the receiver lagged
    missed: VecDeque<CapturedExchange>,
    // Held so the port stays open for the panel's lifetime
    _port: PanelPort,
}

impl LiveFeed {
    /// Next exchange captured after the backlog, or `None` when the session ends
    pub async fn next(&mut self) -> Option<CapturedExchange> {
        loop {
            if let Some(exchange) = self.missed.pop_front() {
                self.next_seq += 1;
                return Some(exchange);
            }

            match self.live.recv().await {
                Ok(event) if event.seq < self.next_seq => continue,
                Ok(event) => {
                    self.next_seq = event.seq + 1;
                    tracing::debug!("New request: {} {}", event.exchange.method, event.exchange.url);
                    return Some(event.exchange);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Panel fell behind the live feed by {} exchanges, catching up from the backlog",
                        skipped
                    );
                    self.catch_up().await;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Queue everything in the backlog from `next_seq` on
    async fn catch_up(&mut self) {
        match self.buffer.replay_backlog().await {
            Ok(backlog) => self.missed.extend(backlog.into_iter().skip(self.next_seq)),
            Err(e) => tracing::warn!("Cannot recover missed exchanges: {}", e),
        }
    }
}

/// Run the relay handshake for a newly loaded panel.
///
/// The live subscription is taken before the request goes out, and anything it
/// delivers that the backlog already contains is skipped, so every exchange
/// reaches the panel exactly once.
pub async fn activate(
    handle: &CaptureHandle,
) -> Result<(Vec<CapturedExchange>, LiveFeed), RelayError> {
    let live = handle.subscribe();
    let mut port = relay::connect(handle, PANEL_PORT_NAME);
    port.post_message(RelayMessage::GetNetworkRequests)?;

    loop {
        match port.recv().await {
            Some(RelayMessage::NetworkRequests { data }) => {
                let feed = LiveFeed {
                    live,
                    next_seq: data.len(),
                    buffer: handle.downgrade(),
                    missed: VecDeque::new(),
                    _port: port,
                };
                return Ok((data, feed));
            }
            Some(RelayMessage::GetNetworkRequests) => {
                tracing::debug!("Ignoring getNetworkRequests sent to a panel");
            }
            None => return Err(RelayError::PortClosed),
        }
    }
}
