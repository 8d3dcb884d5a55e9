//! # PrintDesk Realtime
//!
//! The presence and notification router for the PrintDesk print-shop
//! marketplace. Customers and shop owners connect over Axum WebSockets; the
//! REST order-management layer pushes lifecycle events through the
//! [`RealtimeRouter`](ws::service::RealtimeRouter) without knowing anything
//! about connections.
//!
//! ## Core pieces
//!
//! - **Connection registry**: one live connection per user; a reconnect
//!   replaces the previous handle (last-writer-wins).
//! - **Role-derived rooms**: shop owners land in `shop:<id>`, customers in
//!   `customer:<id>`, computed fresh on every connect.
//! - **Chat relay**: validated, authorized through the same order-access
//!   check the REST path uses, persisted via an injected store, then pushed
//!   to the recipient if connected.
//! - **Order broadcasts**: fire-and-forget dashboard refresh events.
//!
//! Delivery is best-effort and at-most-once throughout: nothing is queued or
//! retried, and durable records belong to the REST layer, written before a
//! broadcast is issued.
//!
//! ## Getting started
//!
//! See the documentation for the `ws` module, and `demos/print_shop_server.rs`
//! for a complete server wiring.
//!
//! ---

pub mod model;
pub mod store;
pub mod ws;

// It will only be part of the crate if the "auth" feature is enabled.
#[cfg(feature = "auth")]
pub mod auth;

/// Public prelude for convenience.
///
/// This allows users to import the most common types with a single `use`
/// statement: `use printdesk_realtime::prelude::*;`
pub mod prelude {
    pub use crate::model::{
        ChatMessage, NewChatMessage, OrderSnapshot, OrderStatus, Principal, Role,
    };
    pub use crate::store::{AccessError, MessageStore, OrderAccess, StoreError};
    pub use crate::ws::{
        protocol::{ClientEvent, ServerEvent},
        service::RealtimeRouter,
        upgrade::upgrade_handler,
    };

    // Re-export the WsAuth extractor if the feature is enabled.
    #[cfg(feature = "auth")]
    pub use crate::auth::{TokenValidator, WsAuth};
}
