//! Domain records shared between the router and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a registered marketplace user.
pub type UserId = i64;

/// Identifier of a print shop.
pub type ShopId = i64;

/// Identifier of a print order.
pub type OrderId = i64;

/// Marketplace role carried by a verified principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    ShopOwner,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "shop_owner" => Some(Self::ShopOwner),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::ShopOwner => "shop_owner",
            Self::Admin => "admin",
        }
    }
}

/// A verified identity handed over by the authentication layer at connect
/// time. Token verification itself happens before a `Principal` exists.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    /// The shop this principal fulfils orders for. Present for shop owners.
    pub shop_id: Option<ShopId>,
}

/// A persisted chat message, owned by the external message store.
///
/// The router creates these through [`MessageStore::save_message`] and pushes
/// them to clients; the read flag is mutated elsewhere.
///
/// [`MessageStore::save_message`]: crate::store::MessageStore::save_message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub order_id: OrderId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    #[serde(rename = "message")]
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// The insert shape handed to the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub order_id: OrderId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    #[serde(rename = "message")]
    pub body: String,
}

/// Lifecycle state of a print order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Printing,
    Ready,
    Completed,
    Cancelled,
}

/// The order record REST handlers pass to the broadcaster after completing
/// their own database writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub customer_id: UserId,
    pub shop_id: ShopId,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_round_trip() {
        for role in [Role::Customer, Role::ShopOwner, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("superuser"), None);
    }

    #[test]
    fn chat_message_serializes_body_as_message() {
        let msg = ChatMessage {
            id: 1,
            order_id: 5,
            sender_id: 2,
            recipient_id: 3,
            body: "Two copies, stapled".to_string(),
            created_at: Utc::now(),
            is_read: false,
        };
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["message"], "Two copies, stapled");
        assert!(json.get("body").is_none());
    }

    #[test]
    fn order_status_uses_snake_case() {
        let json = serde_json::to_value(OrderStatus::Printing).expect("serialize");
        assert_eq!(json, "printing");
    }
}
