use std::sync::Arc;

use common::types::{MessageEnvelope, MessagePayload, MessageSync, UserId};
use tracing::debug;

use crate::metrics::{EVENT_DROP_TOTAL, EVENT_PUSH_TOTAL};
use crate::registry::Registry;

/// Delivers events to every live connection of a recipient.
///
/// Enqueueing never blocks and never fails the caller: by the time anything
/// is pushed the payload is already durable, so a connection that went away
/// is simply pruned and the client recovers the event through the history
/// endpoints on its next join. Delivery is at most once per connection per
/// push; events from the same producer keep their order per connection.
pub struct Fanout {
    registry: Arc<Registry>,
}

impl Fanout {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Enqueue an event for each of the user's live connections. Zero
    /// connections means the user is offline and this is a deliberate no-op.
    pub fn push_to_user(&self, user_id: UserId, msg: MessageSync) {
        for (conn_id, handle) in self.registry.connections_for(user_id) {
            let envelope = MessageEnvelope {
                payload: MessagePayload::Sync { data: msg.clone() },
            };
            if handle.send(envelope).is_ok() {
                EVENT_PUSH_TOTAL.inc();
            } else {
                debug!("pruning closed connection {conn_id} of {user_id}");
                self.registry.unregister(conn_id);
                EVENT_DROP_TOTAL.inc();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{ConnectionId, Notification, NotificationBody, NotificationId};
    use tokio::sync::mpsc;

    fn event() -> MessageSync {
        MessageSync::NotificationDeleted {
            notification_id: NotificationId::new(),
        }
    }

    #[tokio::test]
    async fn push_reaches_each_connection_exactly_once() {
        let registry = Arc::new(Registry::new());
        let fanout = Fanout::new(registry.clone());
        let user = UserId::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register(user, ConnectionId::new(), tx1);
        registry.register(user, ConnectionId::new(), tx2);

        fanout.push_to_user(user, event());

        for rx in [&mut rx1, &mut rx2] {
            assert!(rx.try_recv().is_ok());
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn push_to_offline_user_is_a_noop() {
        let registry = Arc::new(Registry::new());
        let fanout = Fanout::new(registry);
        fanout.push_to_user(UserId::new(), event());
    }

    #[tokio::test]
    async fn closed_connection_is_pruned_without_affecting_others() {
        let registry = Arc::new(Registry::new());
        let fanout = Fanout::new(registry.clone());
        let user = UserId::new();

        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        registry.register(user, ConnectionId::new(), tx_dead);
        registry.register(user, ConnectionId::new(), tx_live);
        drop(rx_dead);

        fanout.push_to_user(user, event());

        assert!(rx_live.try_recv().is_ok());
        assert_eq!(registry.connections_for(user).len(), 1);
    }

    #[tokio::test]
    async fn events_from_one_producer_arrive_in_order() {
        let registry = Arc::new(Registry::new());
        let fanout = Fanout::new(registry.clone());
        let user = UserId::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(user, ConnectionId::new(), tx);

        let first = Notification::new(
            user,
            NotificationBody::FriendRequest {
                requester_id: UserId::new(),
            },
            "first".into(),
        );
        let mut second = first.clone();
        second.message = "second".into();

        for notification in [first.clone(), second.clone()] {
            fanout.push_to_user(user, MessageSync::NewNotification { notification });
        }

        let mut seen = vec![];
        while let Ok(envelope) = rx.try_recv() {
            if let MessagePayload::Sync {
                data: MessageSync::NewNotification { notification },
            } = envelope.payload
            {
                seen.push(notification.message);
            }
        }
        assert_eq!(seen, vec!["first".to_owned(), "second".to_owned()]);
    }
}
