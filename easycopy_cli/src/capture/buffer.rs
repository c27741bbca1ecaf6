//! Capture buffer: the session-long backlog of finished exchanges
//!
//! The buffer runs as its own task and is only reachable through a
//! [`CaptureHandle`]. Appends and replay snapshots are processed one at a
//! time by that task, so a replay never observes half of an append.

use crate::relay::RelayError;
use easycopy_common::CapturedExchange;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// An exchange published on the live feed, tagged with its backlog index
#[derive(Debug, Clone)]
pub struct LiveExchange {
    pub seq: usize,
    pub exchange: CapturedExchange,
}

enum Command {
    Finished(CapturedExchange),
    Replay(oneshot::Sender<Vec<CapturedExchange>>),
}

/// Append-only backlog plus the live feed it publishes to
pub struct CaptureBuffer {
    backlog: Vec<CapturedExchange>,
    live_tx: broadcast::Sender<LiveExchange>,
}

impl CaptureBuffer {
    pub fn new(live_tx: broadcast::Sender<LiveExchange>) -> Self {
        Self {
            backlog: Vec::new(),
            live_tx,
        }
    }

    /// Start the buffer task for an inspection session
    pub fn spawn(live_feed_capacity: usize) -> (CaptureHandle, JoinHandle<()>) {
        let (live_tx, _) = broadcast::channel(live_feed_capacity.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let buffer = CaptureBuffer::new(live_tx.clone());
        let task = tokio::spawn(buffer.run(command_rx));

        let handle = CaptureHandle {
            commands: command_tx,
            live_tx,
        };
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Finished(exchange) => self.append(exchange),
                Command::Replay(reply) => {
                    // Receiver gone means the port closed mid-handshake
                    let _ = reply.send(self.replay());
                }
            }
        }

        tracing::debug!("Capture buffer stopped with {} exchanges", self.len());
    }

    /// Append an exchange and publish it to live subscribers
    pub fn append(&mut self, exchange: CapturedExchange) {
        tracing::debug!(
            "Captured request: {} {} {}",
            exchange.method,
            exchange.url,
            exchange.status
        );

        let seq = self.backlog.len();
        self.backlog.push(exchange.clone());

        // No receivers is fine, nobody is looking yet
        let _ = self.live_tx.send(LiveExchange { seq, exchange });
    }

    /// Snapshot of the full backlog in capture order
    pub fn replay(&self) -> Vec<CapturedExchange> {
        self.backlog.clone()
    }

    fn len(&self) -> usize {
        self.backlog.len()
    }
}

/// Cloneable handle to a running capture buffer
#[derive(Clone)]
pub struct CaptureHandle {
    commands: mpsc::UnboundedSender<Command>,
    live_tx: broadcast::Sender<LiveExchange>,
}

impl CaptureHandle {
    /// Entry point for the network feed, called once per finished exchange
    pub fn on_exchange_finished(&self, exchange: CapturedExchange) {
        if self.commands.send(Command::Finished(exchange)).is_err() {
            tracing::debug!("Capture buffer is gone, dropping exchange");
        }
    }

    /// Get the backlog as it exists when the buffer handles this request
    #[cfg(test)]
    pub async fn replay_backlog(&self) -> Result<Vec<CapturedExchange>, RelayError> {
        request_replay(&self.commands).await
    }

    /// Handle that does not keep the buffer alive
    pub fn downgrade(&self) -> WeakCaptureHandle {
        WeakCaptureHandle {
            commands: self.commands.downgrade(),
        }
    }

    /// Subscribe to exchanges appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LiveExchange> {
        self.live_tx.subscribe()
    }
}

/// Replay-only handle held by relay ports
#[derive(Clone)]
pub struct WeakCaptureHandle {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl WeakCaptureHandle {
    pub async fn replay_backlog(&self) -> Result<Vec<CapturedExchange>, RelayError> {
        let commands = self.commands.upgrade().ok_or(RelayError::BufferClosed)?;
        request_replay(&commands).await
    }
}

async fn request_replay(
    commands: &mpsc::UnboundedSender<Command>,
) -> Result<Vec<CapturedExchange>, RelayError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    commands
        .send(Command::Replay(reply_tx))
        .map_err(|_| RelayError::BufferClosed)?;
    reply_rx.await.map_err(|_| RelayError::BufferClosed)
}
