use std::collections::HashMap;

use common::types::{ConnectionId, MessageEnvelope, UserId};
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::metrics::CONNECTION_COUNT;

/// Sending half of a live connection's outbound queue. The websocket worker
/// owns the receiving half and does the actual IO, so enqueueing here never
/// blocks the caller.
pub type ConnectionHandle = mpsc::UnboundedSender<MessageEnvelope>;

/// Maps authenticated users to their live connections. A user may have any
/// number of connections (tabs, devices); a connection is registered under
/// at most one user at a time.
///
/// Purely in-memory: state is rebuilt as clients rejoin after a restart,
/// and the durable store remains authoritative throughout.
#[derive(Default)]
pub struct Registry {
    by_user: DashMap<UserId, HashMap<ConnectionId, ConnectionHandle>>,
    by_conn: DashMap<ConnectionId, UserId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a live connection with a user. Idempotent per connection;
    /// re-registering a connection under a different user moves it.
    pub fn register(&self, user_id: UserId, conn_id: ConnectionId, handle: ConnectionHandle) {
        if let Some(prev) = self.by_conn.insert(conn_id, user_id) {
            if prev != user_id {
                if let Some(mut conns) = self.by_user.get_mut(&prev) {
                    conns.remove(&conn_id);
                }
            }
        }
        self.by_user.entry(user_id).or_default().insert(conn_id, handle);
        CONNECTION_COUNT.set(self.connection_count() as i64);
    }

    /// Remove a connection from whatever user it was registered under.
    /// No-op if the connection was never registered.
    pub fn unregister(&self, conn_id: ConnectionId) {
        let Some((_, user_id)) = self.by_conn.remove(&conn_id) else {
            return;
        };
        if let Some(mut conns) = self.by_user.get_mut(&user_id) {
            conns.remove(&conn_id);
        }
        self.by_user.remove_if(&user_id, |_, conns| conns.is_empty());
        CONNECTION_COUNT.set(self.connection_count() as i64);
    }

    /// Every live connection of a user. Empty means the user is offline;
    /// callers treat that as "nothing to push live", never as an error.
    pub fn connections_for(&self, user_id: UserId) -> Vec<(ConnectionId, ConnectionHandle)> {
        self.by_user
            .get(&user_id)
            .map(|conns| {
                conns
                    .iter()
                    .map(|(conn_id, handle)| (*conn_id, handle.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.by_conn.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ConnectionHandle {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn offline_user_has_no_connections() {
        let registry = Registry::new();
        assert!(registry.connections_for(UserId::new()).is_empty());
    }

    #[test]
    fn register_and_unregister_round_trip() {
        let registry = Registry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();

        registry.register(user, conn, handle());
        assert_eq!(registry.connections_for(user).len(), 1);

        registry.unregister(conn);
        assert!(registry.connections_for(user).is_empty());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn unregister_of_unknown_connection_is_a_noop() {
        let registry = Registry::new();
        registry.unregister(ConnectionId::new());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn user_can_hold_multiple_connections() {
        let registry = Registry::new();
        let user = UserId::new();
        registry.register(user, ConnectionId::new(), handle());
        registry.register(user, ConnectionId::new(), handle());
        assert_eq!(registry.connections_for(user).len(), 2);
    }

    #[test]
    fn reregistering_moves_the_connection_between_users() {
        let registry = Registry::new();
        let (a, b) = (UserId::new(), UserId::new());
        let conn = ConnectionId::new();

        registry.register(a, conn, handle());
        registry.register(b, conn, handle());

        assert!(registry.connections_for(a).is_empty());
        assert_eq!(registry.connections_for(b).len(), 1);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn register_is_idempotent_per_connection() {
        let registry = Registry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();
        registry.register(user, conn, handle());
        registry.register(user, conn, handle());
        assert_eq!(registry.connections_for(user).len(), 1);
    }
}
