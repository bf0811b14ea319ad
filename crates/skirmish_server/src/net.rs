//! # Transport Layer
//!
//! Persistent bidirectional channel between clients and the simulation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   crossbeam    ┌──────────────┐    clone    ┌──────────────┐
//! │ Reader tasks │ ─────────────► │  Simulation  │ ──────────► │ BroadcastHub │
//! │ (tokio, one  │  SessionEvent  │  thread      │ ServerMsg   │ writer queues│
//! │  per client) │                │  (sync)      │             │ (tokio mpsc) │
//! └──────────────┘                └──────────────┘             └──────────────┘
//! ```
//!
//! Framing is one JSON object per line. Reader tasks decode inbound
//! [`ClientMessage`]s and push [`SessionEvent`]s over a bounded channel; the
//! simulation thread drains that channel at the tick boundary, so transport
//! concurrency never touches world state. Outbound messages go through the
//! [`BroadcastHub`], a registry of per-connection writer queues.
//!
//! A malformed inbound line is logged and dropped - one confused client
//! must not take the server down.

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use skirmish_shared::protocol::{ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};

/// Capacity of the inbound event channel.
pub const EVENT_QUEUE_SIZE: usize = 10_000;

/// Unique identifier for a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn{}", self.0)
    }
}

/// Inbound event from a transport task.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A client connected.
    Connected(ConnectionId),
    /// A decoded message arrived.
    Message(ConnectionId, ClientMessage),
    /// A client went away (socket closed or errored).
    Disconnected(ConnectionId),
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Could not bind or accept on the listen socket.
    #[error("transport: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry of connected clients' outbound queues.
///
/// Shared between the simulation thread (which sends) and transport tasks
/// (which register and unregister themselves).
#[derive(Default)]
pub struct BroadcastHub {
    clients: Mutex<HashMap<ConnectionId, UnboundedSender<ServerMessage>>>,
}

impl BroadcastHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound queue.
    pub fn register(&self, id: ConnectionId, tx: UnboundedSender<ServerMessage>) {
        self.clients.lock().insert(id, tx);
    }

    /// Removes a connection's outbound queue.
    pub fn unregister(&self, id: ConnectionId) {
        self.clients.lock().remove(&id);
    }

    /// Sends a message to one client. Dead connections are dropped silently;
    /// their reader task will report the disconnect.
    pub fn send_to(&self, id: ConnectionId, message: ServerMessage) {
        if let Some(tx) = self.clients.lock().get(&id) {
            let _ = tx.send(message);
        }
    }

    /// Sends a message to every connected client.
    pub fn broadcast(&self, message: &ServerMessage) {
        for tx in self.clients.lock().values() {
            let _ = tx.send(message.clone());
        }
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// True when no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

/// Accepts connections forever, spawning a reader and a writer task per
/// client.
///
/// Runs on the tokio runtime; the simulation thread is on the other end of
/// `events`.
pub async fn run_listener(
    bind_address: SocketAddr,
    events: Sender<SessionEvent>,
    hub: Arc<BroadcastHub>,
) -> Result<(), NetError> {
    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(%bind_address, "listening");

    let next_id = AtomicU32::new(1);
    loop {
        let (stream, peer) = listener.accept().await?;
        let id = ConnectionId(next_id.fetch_add(1, Ordering::Relaxed));
        tracing::info!(%id, %peer, "client connected");
        tokio::spawn(handle_connection(stream, id, events.clone(), Arc::clone(&hub)));
    }
}

async fn handle_connection(
    stream: TcpStream,
    id: ConnectionId,
    events: Sender<SessionEvent>,
    hub: Arc<BroadcastHub>,
) {
    let (read_half, mut write_half) = stream.into_split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    hub.register(id, tx);

    if events.send(SessionEvent::Connected(id)).is_err() {
        // Simulation is gone; nothing to do for this connection.
        hub.unregister(id);
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let mut line = match serde_json::to_string(&message) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(%id, error = %e, "failed to encode outbound message");
                    continue;
                }
            };
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(line) {
                    Ok(message) => {
                        if events.send(SessionEvent::Message(id, message)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(%id, error = %e, "dropping malformed message");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%id, error = %e, "read failed");
                break;
            }
        }
    }

    hub.unregister(id);
    let _ = events.send(SessionEvent::Disconnected(id));
    writer.abort();
    tracing::info!(%id, "client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_send_to_and_broadcast() {
        let hub = BroadcastHub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.register(ConnectionId(1), tx_a);
        hub.register(ConnectionId(2), tx_b);

        hub.send_to(ConnectionId(1), ServerMessage::Broadcast { text: "only a".to_owned() });
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());

        hub.broadcast(&ServerMessage::Broadcast { text: "everyone".to_owned() });
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_hub_unregister() {
        let hub = BroadcastHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.register(ConnectionId(1), tx);
        assert_eq!(hub.len(), 1);

        hub.unregister(ConnectionId(1));
        assert!(hub.is_empty());

        // Sending to a gone connection is a quiet no-op.
        hub.send_to(ConnectionId(1), ServerMessage::Broadcast { text: "void".to_owned() });
    }
}
