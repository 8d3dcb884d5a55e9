//! WebSocket connection handling and event routing.

pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod service;
pub mod types;
pub mod upgrade;
