//! Axum handler glue for upgrading HTTP requests into router connections.

use std::sync::Arc;

use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use tracing::instrument;

use crate::model::Principal;
use crate::store::{MessageStore, OrderAccess};
use crate::ws::service::RealtimeRouter;

/// Upgrades a verified request and hands the socket to the router.
///
/// Authentication must happen before this point, typically through the
/// `WsAuth` extractor, which rejects bad tokens with 401 before any
/// connection state exists. Channel membership is derived from the
/// principal's role, so there is nothing further to authorize here.
///
/// ## Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use async_trait::async_trait;
/// # use axum::{Router, routing::get, extract::{State, ws::WebSocketUpgrade}};
/// # use printdesk_realtime::auth::{TokenValidator, WsAuth};
/// # use printdesk_realtime::model::{ChatMessage, NewChatMessage, OrderId, Principal, Role, UserId};
/// # use printdesk_realtime::store::{AccessError, MessageStore, OrderAccess, StoreError};
/// # use printdesk_realtime::ws::{service::RealtimeRouter, upgrade::upgrade_handler};
/// #
/// # struct Desk;
/// # #[async_trait]
/// # impl MessageStore for Desk {
/// #     async fn save_message(&self, _m: NewChatMessage) -> Result<ChatMessage, StoreError> {
/// #         Err(StoreError::Unavailable)
/// #     }
/// # }
/// # #[async_trait]
/// # impl OrderAccess for Desk {
/// #     async fn ensure_participant(&self, _o: OrderId, _u: UserId) -> Result<(), AccessError> {
/// #         Ok(())
/// #     }
/// # }
/// #
/// #[derive(Clone)]
/// struct ServerState {
///     router: Arc<RealtimeRouter<Desk>>,
/// }
/// # #[async_trait]
/// # impl TokenValidator for ServerState {
/// #     type Error = std::io::Error;
/// #     async fn validate_token(&self, _token: &str) -> Result<Principal, Self::Error> {
/// #         Ok(Principal { user_id: 1, display_name: "Alice".into(), role: Role::Customer, shop_id: None })
/// #     }
/// # }
///
/// let app: Router<ServerState> = Router::new().route(
///     "/ws",
///     get(
///         |ws: WebSocketUpgrade, State(state): State<ServerState>, WsAuth(principal): WsAuth| async move {
///             upgrade_handler(ws, State(state.router.clone()), principal).await
///         },
///     ),
/// );
/// ```
#[instrument(skip_all, fields(user_id = principal.user_id, role = ?principal.role))]
pub async fn upgrade_handler<S>(
    ws: WebSocketUpgrade,
    State(router): State<Arc<RealtimeRouter<S>>>,
    principal: Principal,
) -> Response
where
    S: MessageStore + OrderAccess,
{
    ws.on_upgrade(move |socket| async move {
        router.handle_connection(socket, principal).await;
    })
}
