//! Connect-time authentication for dashboard WebSocket clients.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use async_trait::async_trait;
//! # use axum::{routing::get, Router};
//! # use printdesk_realtime::auth::{TokenValidator, WsAuth};
//! # use printdesk_realtime::model::{Principal, Role};
//! #
//! // Your application's shared state, owning whatever the token check needs
//! // (a session table, a JWT key, ...).
//! #[derive(Clone)]
//! struct AppState;
//!
//! #[async_trait]
//! impl TokenValidator for AppState {
//!     type Error = std::io::Error;
//!
//!     async fn validate_token(&self, token: &str) -> Result<Principal, Self::Error> {
//!         if token == "secret-token" {
//!             Ok(Principal {
//!                 user_id: 1,
//!                 display_name: "Alice".to_string(),
//!                 role: Role::Customer,
//!                 shop_id: None,
//!             })
//!         } else {
//!             Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid token"))
//!         }
//!     }
//! }
//!
//! async fn ws_route(WsAuth(principal): WsAuth) -> String {
//!     format!("hello {}", principal.display_name)
//! }
//!
//! let app: Router<AppState> = Router::new()
//!     .route("/ws", get(ws_route))
//!     .with_state(AppState);
//! ```

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::model::Principal;

/// The trait the application state must implement to enable `WsAuth`.
///
/// Token verification itself (JWT decode, session lookup) is owned by the
/// external auth layer; this seam only turns its token into a verified
/// [`Principal`].
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// The error type returned on validation failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Validates a token string and returns the verified principal.
    async fn validate_token(&self, token: &str) -> Result<Principal, Self::Error>;
}

/// WebSocket authentication extractor.
///
/// Pulls a bearer token from the `Authorization` header or a `token` query
/// parameter and verifies it through the state's [`TokenValidator`].
/// Connections that fail verification are rejected with `401 Unauthorized`
/// before any registry entry is created.
#[derive(Debug)]
pub struct WsAuth(pub Principal);

/// The query parameter struct used internally for token extraction.
#[derive(Deserialize)]
struct WebSocketAuthQuery {
    token: String,
}

impl<S> FromRequestParts<S> for WsAuth
where
    S: TokenValidator + Send + Sync + 'static,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl Future<Output = Result<Self, <Self as FromRequestParts<S>>::Rejection>> + Send {
        Box::pin(async move {
            // Extract token from header or query
            let token = get_token_from_headers(&parts.headers);
            let token = if let Some(t) = token {
                Some(t)
            } else {
                match Query::<WebSocketAuthQuery>::from_request_parts(parts, state).await {
                    Ok(Query(q)) => Some(q.token),
                    Err(_) => None,
                }
            };

            let token = match token {
                Some(t) => t,
                None => return Err(StatusCode::UNAUTHORIZED.into_response()),
            };

            match state.validate_token(&token).await {
                Ok(principal) => Ok(WsAuth(principal)),
                Err(_) => Err(StatusCode::UNAUTHORIZED.into_response()),
            }
        })
    }
}

/// A private helper function to extract a bearer token from the Authorization header.
fn get_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header_val| {
            header_val
                .strip_prefix("Bearer ")
                .map(|token| token.to_owned())
        })
}
