// printdesk-realtime/src/ws/protocol.rs

//! Wire-level events exchanged with dashboard clients.
//!
//! Frames are JSON text, tagged by a `type` field. Unknown or malformed
//! frames are answered with an `error` event rather than dropped silently;
//! the connection itself stays up.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ChatMessage, OrderId, OrderSnapshot, UserId};

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        order_id: OrderId,
        message: String,
        recipient_id: UserId,
    },
    TypingStart {
        order_id: OrderId,
        recipient_id: UserId,
    },
    TypingStop {
        order_id: OrderId,
        recipient_id: UserId,
    },
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A chat message addressed to this client, with the sender's display
    /// name for rendering.
    NewMessage {
        message: ChatMessage,
        sender_name: String,
    },
    /// Acknowledgment to the sender that its message was persisted.
    MessageSent { message: ChatMessage },
    UserTyping {
        user_id: UserId,
        user_name: String,
        order_id: OrderId,
    },
    UserStoppedTyping {
        user_id: UserId,
        order_id: OrderId,
    },
    OrderUpdated { order: OrderSnapshot },
    OrderStatusChanged { order: OrderSnapshot },
    NewOrder { order: OrderSnapshot },
    /// Arbitrary payload pushed to one user, dropped if they are offline.
    Notification { payload: Value },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_parse_from_tagged_json() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","order_id":5,"message":"Ready by noon?","recipient_id":2}"#,
        )
        .expect("parse send_message");
        assert_eq!(
            event,
            ClientEvent::SendMessage {
                order_id: 5,
                message: "Ready by noon?".to_string(),
                recipient_id: 2,
            }
        );

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"typing_start","order_id":5,"recipient_id":2}"#)
                .expect("parse typing_start");
        assert_eq!(event, ClientEvent::TypingStart { order_id: 5, recipient_id: 2 });
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"shutdown"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[test]
    fn server_events_carry_snake_case_type_tags() {
        let json = serde_json::to_value(ServerEvent::UserStoppedTyping { user_id: 1, order_id: 5 })
            .expect("serialize");
        assert_eq!(json["type"], "user_stopped_typing");
        assert_eq!(json["user_id"], 1);

        let json = serde_json::to_value(ServerEvent::Error { message: "nope".to_string() })
            .expect("serialize");
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "nope");
    }

    #[test]
    fn notification_payload_passes_through_untouched() {
        let payload = serde_json::json!({
            "kind": "order_ready",
            "order_id": 5,
            "message": "Your prints are ready for pickup",
        });
        let json = serde_json::to_value(ServerEvent::Notification { payload: payload.clone() })
            .expect("serialize");
        assert_eq!(json["type"], "notification");
        assert_eq!(json["payload"], payload);
    }
}
