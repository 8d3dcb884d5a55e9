//! A complete demo server: the realtime router wired into an Axum app with an
//! in-memory marketplace database.
//!
//! Connect a dashboard client with e.g.
//! `websocat 'ws://127.0.0.1:3000/ws?token=1:customer:Alice'`, then exercise
//! the REST-ish routes to see broadcasts arrive.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use printdesk_realtime::model::{OrderId, UserId};
use printdesk_realtime::prelude::*;
use serde::Deserialize;
use tracing::info;

// 1. An in-memory stand-in for the marketplace database.

#[derive(Default)]
struct InMemoryDesk {
    messages: Mutex<Vec<ChatMessage>>,
    orders: Mutex<HashMap<OrderId, OrderSnapshot>>,
    participants: Mutex<HashMap<OrderId, (UserId, UserId)>>,
    next_message_id: AtomicI64,
    next_order_id: AtomicI64,
}

#[async_trait::async_trait]
impl MessageStore for InMemoryDesk {
    async fn save_message(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let message = ChatMessage {
            id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
            order_id: message.order_id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            body: message.body,
            created_at: Utc::now(),
            is_read: false,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }
}

#[async_trait::async_trait]
impl OrderAccess for InMemoryDesk {
    async fn ensure_participant(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<(), AccessError> {
        let participants = self.participants.lock().unwrap();
        match participants.get(&order_id) {
            Some((customer_id, owner_id)) if user_id == *customer_id || user_id == *owner_id => {
                Ok(())
            }
            Some(_) => Err(AccessError::NotParticipant { order_id, user_id }),
            None => Err(AccessError::OrderNotFound(order_id)),
        }
    }
}

// 2. Token validation. The demo token is `<user_id>:<role>:<name>[:<shop_id>]`,
// e.g. `1:customer:Alice` or `10:shop_owner:Bob:7`. A real deployment would
// verify a JWT here instead.

#[derive(Debug)]
struct AuthError(String);

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for AuthError {}

#[derive(Clone)]
struct ServerState {
    desk: Arc<InMemoryDesk>,
    router: Arc<RealtimeRouter<InMemoryDesk>>,
}

#[async_trait::async_trait]
impl TokenValidator for ServerState {
    type Error = AuthError;

    async fn validate_token(&self, token: &str) -> Result<Principal, Self::Error> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        let parts: Vec<&str> = token.split(':').collect();
        let (user_id, role, name) = match parts.as_slice() {
            [user_id, role, name] | [user_id, role, name, _] => (user_id, role, name),
            _ => {
                return Err(AuthError(
                    "expected <user_id>:<role>:<name>[:<shop_id>]".to_string(),
                ));
            }
        };

        let user_id: UserId = user_id
            .parse()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AuthError(format!("bad user id {user_id:?}")))?;
        let role = Role::from_str(role).ok_or_else(|| AuthError(format!("unknown role {role:?}")))?;
        let shop_id = parts.get(3).and_then(|raw| raw.parse().ok());

        Ok(Principal {
            user_id,
            display_name: name.to_string(),
            role,
            shop_id,
        })
    }
}

// 3. REST-ish routes standing in for the external order-management layer.
// Each one completes its "database write" first, then fires a broadcast.

#[derive(Deserialize)]
struct CreateOrder {
    customer_id: UserId,
    owner_id: UserId,
}

async fn create_order(
    State(state): State<ServerState>,
    Path(shop_id): Path<i64>,
    Json(req): Json<CreateOrder>,
) -> Json<OrderSnapshot> {
    let order = OrderSnapshot {
        id: state.desk.next_order_id.fetch_add(1, Ordering::SeqCst) + 1,
        customer_id: req.customer_id,
        shop_id,
        status: OrderStatus::Pending,
        updated_at: Utc::now(),
    };
    state.desk.orders.lock().unwrap().insert(order.id, order.clone());
    state
        .desk
        .participants
        .lock()
        .unwrap()
        .insert(order.id, (req.customer_id, req.owner_id));

    state.router.broadcast_new_order(&order, shop_id);
    Json(order)
}

#[derive(Deserialize)]
struct UpdateStatus {
    status: OrderStatus,
}

async fn update_order_status(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateStatus>,
) -> Result<Json<OrderSnapshot>, StatusCode> {
    let order = {
        let mut orders = state.desk.orders.lock().unwrap();
        let order = orders.get_mut(&order_id).ok_or(StatusCode::NOT_FOUND)?;
        order.status = req.status;
        order.updated_at = Utc::now();
        order.clone()
    };

    state.router.broadcast_order_updated(&order, order.shop_id);
    Ok(Json(order))
}

async fn notify_user(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    state.router.push_notification(user_id, payload);
    StatusCode::ACCEPTED
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("print_shop_server=info".parse().unwrap())
                .add_directive("printdesk_realtime=info".parse().unwrap()),
        )
        .init();

    let desk = Arc::new(InMemoryDesk::default());
    let router = RealtimeRouter::new(Arc::clone(&desk));
    let state = ServerState { desk, router };

    let app = Router::new()
        .route(
            "/ws",
            get(
                |ws: WebSocketUpgrade,
                 State(state): State<ServerState>,
                 WsAuth(principal): WsAuth| async move {
                    upgrade_handler(ws, State(state.router.clone()), principal).await
                },
            ),
        )
        .route("/shops/{shop_id}/orders", post(create_order))
        .route("/orders/{order_id}/status", post(update_order_status))
        .route("/users/{user_id}/notify", post(notify_user))
        .route("/health", get(|| async { "OK" }))
        .with_state(state);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .expect("BIND_ADDR must be host:port");
    info!("Listening on {}", addr);
    info!("Try: websocat 'ws://{}/ws?token=1:customer:Alice'", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
