//! The connection registry: which users currently have a live connection.

use dashmap::DashMap;

use crate::model::UserId;
use crate::ws::types::{ConnectionHandle, ConnectionId};

/// Tracks the single active connection per user.
///
/// A reconnect overwrites the previous handle (last-writer-wins); there is no
/// multi-device fan-out. All mutation goes through this type, which keeps the
/// map swappable for an external registry if multi-node delivery is ever
/// needed.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` as the user's active connection, replacing any
    /// previous one. Idempotent; never fails.
    pub fn register(&self, user_id: UserId, handle: ConnectionHandle) {
        self.connections.insert(user_id, handle);
    }

    /// Removes the user's mapping. No-op if absent.
    pub fn unregister(&self, user_id: UserId) {
        self.connections.remove(&user_id);
    }

    /// Removes the mapping only while it still belongs to `conn_id`.
    ///
    /// A disconnect for a connection that has already been replaced by a
    /// reconnect must not evict the newer handle. Returns whether an entry
    /// was removed.
    pub fn remove_connection(&self, user_id: UserId, conn_id: ConnectionId) -> bool {
        self.connections
            .remove_if(&user_id, |_, handle| handle.conn_id() == conn_id)
            .is_some()
    }

    /// The user's active handle, if any. Absence means "deliver nothing",
    /// never an error.
    pub fn lookup(&self, user_id: UserId) -> Option<ConnectionHandle> {
        self.connections.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle() -> ConnectionHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        ConnectionHandle::new(ConnectionId::new_v4(), tx)
    }

    #[test]
    fn lookup_returns_most_recent_registration() {
        let registry = ConnectionRegistry::new();
        assert!(registry.lookup(1).is_none());

        let first = handle();
        registry.register(1, first.clone());
        assert_eq!(registry.lookup(1).expect("registered").conn_id(), first.conn_id());

        let second = handle();
        registry.register(1, second.clone());
        assert_eq!(registry.lookup(1).expect("replaced").conn_id(), second.conn_id());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        registry.register(1, handle());

        registry.unregister(1);
        assert!(registry.lookup(1).is_none());

        // Absent and never-registered users are both no-ops.
        registry.unregister(1);
        registry.unregister(42);
    }

    #[test]
    fn stale_disconnect_does_not_evict_newer_handle() {
        let registry = ConnectionRegistry::new();
        let old = handle();
        let new = handle();

        registry.register(1, old.clone());
        registry.register(1, new.clone());

        assert!(!registry.remove_connection(1, old.conn_id()));
        assert_eq!(registry.lookup(1).expect("still live").conn_id(), new.conn_id());

        assert!(registry.remove_connection(1, new.conn_id()));
        assert!(registry.lookup(1).is_none());
    }
}
