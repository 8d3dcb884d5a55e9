// printdesk-realtime/src/ws/types.rs

//! Internal types used by the realtime router.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A unique identifier for a single WebSocket connection.
pub type ConnectionId = Uuid;

/// The push half of one client connection.
///
/// Cloneable and cheap. Pushing is a non-blocking channel send: a dedicated
/// writer task owns the socket sink and drains this channel, so callers never
/// contend on the socket itself.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    conn_id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    pub(crate) fn new(conn_id: ConnectionId, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { conn_id, tx }
    }

    /// The connection this handle pushes to.
    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Best-effort push. Returns false when the connection is already tearing
    /// down and the message was dropped.
    pub(crate) fn push(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }
}
