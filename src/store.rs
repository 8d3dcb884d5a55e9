//! Seams to the externally-owned persistence and authorization layers.
//!
//! The router never touches a database itself. Message durability and the
//! order-participancy check live behind these traits so the REST side of the
//! marketplace can plug in its own implementations.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ChatMessage, NewChatMessage, OrderId, UserId};

/// Failure saving a chat message. The display form is safe to forward to the
/// sending client as an `error` event.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message could not be saved: {0}")]
    Rejected(String),
    #[error("message store unavailable")]
    Unavailable,
}

/// Failure of the order-participancy check.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
    #[error("user {user_id} is not a participant of order {order_id}")]
    NotParticipant { order_id: OrderId, user_id: UserId },
}

/// Append-only persistence for chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Stores a new message and returns the persisted record.
    ///
    /// Either the message is fully persisted or the error leaves no partial
    /// state behind; the router relays nothing on failure.
    async fn save_message(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError>;
}

/// The participancy check the order REST endpoints perform: a user may only
/// act on an order they placed or fulfil.
#[async_trait]
pub trait OrderAccess: Send + Sync + 'static {
    async fn ensure_participant(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<(), AccessError>;
}
