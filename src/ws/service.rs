//! The realtime router: connection lifecycle, chat relay, and order
//! broadcasts.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::{
    SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::model::{NewChatMessage, OrderId, OrderSnapshot, Principal, ShopId, UserId};
use crate::store::{MessageStore, OrderAccess};
use crate::ws::protocol::{ClientEvent, ServerEvent};
use crate::ws::registry::ConnectionRegistry;
use crate::ws::rooms::{Channel, RoomMap, channels_for};
use crate::ws::types::{ConnectionHandle, ConnectionId};

/// The presence and notification router for one marketplace process.
///
/// Owns the connection registry and room memberships. Everything it delivers
/// is best-effort and at-most-once: if a recipient has no live connection the
/// event is dropped, with no queuing and no retry. Callers needing a durable
/// record must write it through the REST layer before broadcasting.
///
/// Generic over the store so the REST side can plug in its own persistence
/// and order-access checks.
pub struct RealtimeRouter<S> {
    registry: ConnectionRegistry,
    rooms: RoomMap,
    store: Arc<S>,
}

impl<S> fmt::Debug for RealtimeRouter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeRouter")
            .field("connections", &self.registry.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

impl<S> RealtimeRouter<S>
where
    S: MessageStore + OrderAccess,
{
    /// Creates a router backed by the given persistence/authorization
    /// collaborator.
    pub fn new(store: Arc<S>) -> Arc<Self> {
        Arc::new(Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomMap::new(),
            store,
        })
    }

    /// Entry point called once per verified connection, after the HTTP
    /// upgrade. Runs until the client disconnects.
    #[instrument(skip_all, fields(conn_id, user_id = principal.user_id, role = ?principal.role))]
    pub async fn handle_connection(self: Arc<Self>, socket: WebSocket, principal: Principal) {
        let conn_id = ConnectionId::new_v4();
        tracing::Span::current().record("conn_id", &tracing::field::display(conn_id));

        let (sink, stream) = socket.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(conn_id, tx);

        tokio::spawn(write_outbound(sink, rx));

        self.attach(&principal, handle.clone());
        info!("client connected");

        let router = Arc::clone(&self);
        tokio::spawn(async move {
            router.read_client_events(stream, principal, handle).await;
        });
    }

    /// Registers the connection and joins its role-derived channels.
    fn attach(&self, principal: &Principal, handle: ConnectionHandle) {
        self.registry.register(principal.user_id, handle);
        for channel in channels_for(principal) {
            self.rooms.join(channel, principal.user_id);
        }
    }

    /// Tears down registry and room state for a finished connection.
    ///
    /// Guarded by connection id: a disconnect that lost a reconnect race
    /// leaves the newer connection's state untouched. Safe to call more than
    /// once.
    fn detach(&self, principal: &Principal, conn_id: ConnectionId) {
        if self.registry.remove_connection(principal.user_id, conn_id) {
            self.rooms.leave_all(principal.user_id);
            info!("client disconnected");
        } else {
            debug!("stale disconnect ignored");
        }
    }

    /// Per-connection read loop. A failure handling one frame never affects
    /// other connections.
    #[instrument(skip_all, fields(conn_id = %handle.conn_id(), user_id = principal.user_id))]
    async fn read_client_events(
        &self,
        mut stream: SplitStream<WebSocket>,
        principal: Principal,
        handle: ConnectionHandle,
    ) {
        while let Some(Ok(frame)) = stream.next().await {
            match frame {
                Message::Text(text) => {
                    self.handle_text_frame(&principal, &handle, &text).await;
                }
                Message::Close(_) => {
                    debug!("close frame received");
                    break;
                }
                _ => {}
            }
        }
        self.detach(&principal, handle.conn_id());
    }

    async fn handle_text_frame(&self, principal: &Principal, handle: &ConnectionHandle, text: &str) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_client_event(principal, handle, event).await,
            Err(err) => {
                warn!("unparseable client frame: {err}");
                self.emit(
                    handle,
                    &ServerEvent::Error { message: "invalid event format".to_string() },
                );
            }
        }
    }

    async fn handle_client_event(
        &self,
        principal: &Principal,
        handle: &ConnectionHandle,
        event: ClientEvent,
    ) {
        match event {
            ClientEvent::SendMessage { order_id, message, recipient_id } => {
                self.relay_message(principal, handle, order_id, message, recipient_id)
                    .await;
            }
            ClientEvent::TypingStart { order_id, recipient_id } => {
                self.relay_typing(principal, order_id, recipient_id, true);
            }
            ClientEvent::TypingStop { order_id, recipient_id } => {
                self.relay_typing(principal, order_id, recipient_id, false);
            }
        }
    }

    /// Persists a chat message and forwards it to the recipient if connected.
    ///
    /// The sender's order participancy is checked through the same
    /// collaborator the REST endpoints use before anything is persisted.
    /// Every failure mode is reported to the sender alone as an `error`
    /// event; the recipient sees nothing on failure.
    async fn relay_message(
        &self,
        principal: &Principal,
        handle: &ConnectionHandle,
        order_id: OrderId,
        message: String,
        recipient_id: UserId,
    ) {
        let body = message.trim();
        if body.is_empty() || order_id <= 0 || recipient_id <= 0 {
            self.emit(
                handle,
                &ServerEvent::Error { message: "invalid message payload".to_string() },
            );
            return;
        }

        if let Err(err) = self.store.ensure_participant(order_id, principal.user_id).await {
            warn!(order_id, "message rejected: {err}");
            self.emit(handle, &ServerEvent::Error { message: err.to_string() });
            return;
        }

        let new_message = NewChatMessage {
            order_id,
            sender_id: principal.user_id,
            recipient_id,
            body: body.to_string(),
        };
        let message = match self.store.save_message(new_message).await {
            Ok(message) => message,
            Err(err) => {
                error!(order_id, "failed to save chat message: {err}");
                self.emit(
                    handle,
                    &ServerEvent::Error { message: "message could not be delivered".to_string() },
                );
                return;
            }
        };

        if let Some(recipient) = self.registry.lookup(recipient_id) {
            self.emit(
                &recipient,
                &ServerEvent::NewMessage {
                    message: message.clone(),
                    sender_name: principal.display_name.clone(),
                },
            );
        } else {
            debug!(recipient_id, "recipient offline, message stored only");
        }

        self.emit(handle, &ServerEvent::MessageSent { message });
    }

    /// Best-effort typing indicator forward. Never persisted, never acked;
    /// an offline recipient is silently a no-op.
    fn relay_typing(
        &self,
        principal: &Principal,
        order_id: OrderId,
        recipient_id: UserId,
        started: bool,
    ) {
        let Some(recipient) = self.registry.lookup(recipient_id) else {
            return;
        };
        let event = if started {
            ServerEvent::UserTyping {
                user_id: principal.user_id,
                user_name: principal.display_name.clone(),
                order_id,
            }
        } else {
            ServerEvent::UserStoppedTyping { user_id: principal.user_id, order_id }
        };
        self.emit(&recipient, &event);
    }

    /// Emits `order_updated` to the shop's room and `order_status_changed`
    /// to the owning customer's channel.
    ///
    /// Best-effort, at-most-once, no durability: connections that are not
    /// there simply do not hear about it.
    pub fn broadcast_order_updated(&self, order: &OrderSnapshot, shop_id: ShopId) {
        self.emit_to_channel(
            Channel::Shop(shop_id),
            &ServerEvent::OrderUpdated { order: order.clone() },
        );
        self.emit_to_channel(
            Channel::Customer(order.customer_id),
            &ServerEvent::OrderStatusChanged { order: order.clone() },
        );
    }

    /// Emits `new_order` to the shop's room only. Best-effort, at-most-once.
    pub fn broadcast_new_order(&self, order: &OrderSnapshot, shop_id: ShopId) {
        self.emit_to_channel(
            Channel::Shop(shop_id),
            &ServerEvent::NewOrder { order: order.clone() },
        );
    }

    /// Pushes an arbitrary payload to one user's connection, dropping it
    /// silently when the user is offline. Best-effort, at-most-once; any
    /// durable notification record is the caller's responsibility.
    pub fn push_notification(&self, user_id: UserId, payload: serde_json::Value) {
        if let Some(handle) = self.registry.lookup(user_id) {
            self.emit(&handle, &ServerEvent::Notification { payload });
        }
    }

    fn emit_to_channel(&self, channel: Channel, event: &ServerEvent) {
        let members = self.rooms.members(&channel);
        if members.is_empty() {
            return;
        }
        let Some(frame) = encode(event) else { return };
        debug!(%channel, count = members.len(), "broadcasting event");
        for user_id in members {
            if let Some(handle) = self.registry.lookup(user_id) {
                handle.push(frame.clone());
            }
        }
    }

    fn emit(&self, handle: &ConnectionHandle, event: &ServerEvent) {
        if let Some(frame) = encode(event) {
            if !handle.push(frame) {
                debug!(conn_id = %handle.conn_id(), "push to closed connection dropped");
            }
        }
    }
}

/// Serializes a server event into a text frame.
fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(Utf8Bytes::from(json))),
        Err(err) => {
            error!("failed to serialize server event: {err}");
            None
        }
    }
}

/// Writer half of one connection: drains the outbound queue into the socket
/// sink until either side goes away.
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if sink.send(message).await.is_err() {
            break;
        }
    }
}
