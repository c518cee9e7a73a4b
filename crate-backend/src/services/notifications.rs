use std::sync::Arc;

use common::types::{
    MessageSync, Notification, NotificationBody, NotificationId, NotificationKind, Time, UserId,
};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{Error, Result, ServerStateInner};

type AggregationKey = (UserId, NotificationKind, Uuid);

pub struct ServiceNotifications {
    state: Arc<ServerStateInner>,

    /// one critical section per aggregation key, so two concurrent events
    /// with the same key cannot both observe "no existing record" and
    /// insert duplicates
    agg_locks: DashMap<AggregationKey, Arc<Mutex<()>>>,
}

impl ServiceNotifications {
    pub fn new(state: Arc<ServerStateInner>) -> Self {
        Self {
            state,
            agg_locks: DashMap::new(),
        }
    }

    fn agg_lock(&self, key: AggregationKey) -> Arc<Mutex<()>> {
        self.agg_locks.entry(key).or_default().clone()
    }

    /// Record a notification and push it to the recipient's live
    /// connections.
    ///
    /// Repeatable kinds (message alerts, friend requests) merge into an
    /// existing record with the same (kind, counterpart) key for as long as
    /// that record is unread: the count goes up and the timestamp and text
    /// refresh, instead of a duplicate appearing. Marking the record viewed
    /// does not end the merging; marking it read does.
    pub async fn notify(
        &self,
        recipient_id: UserId,
        body: NotificationBody,
        message: String,
    ) -> Result<Notification> {
        let data = self.state.data();

        if body.aggregates() {
            let key = (recipient_id, body.kind(), body.related_id());
            let lock = self.agg_lock(key);
            let _guard = lock.lock().await;

            if let Some(existing) = data
                .notification_find_unread(recipient_id, body.kind(), body.related_id())
                .await?
            {
                let updated = data
                    .notification_bump(existing.id, &message, Time::now_utc())
                    .await?;
                self.state.fanout.push_to_user(
                    recipient_id,
                    MessageSync::NewNotification {
                        notification: updated.clone(),
                    },
                );
                return Ok(updated);
            }

            self.insert_and_push(Notification::new(recipient_id, body, message))
                .await
        } else {
            self.insert_and_push(Notification::new(recipient_id, body, message))
                .await
        }
    }

    async fn insert_and_push(&self, notification: Notification) -> Result<Notification> {
        self.state
            .data()
            .notification_insert(notification.clone())
            .await?;
        self.state.fanout.push_to_user(
            notification.recipient_id,
            MessageSync::NewNotification {
                notification: notification.clone(),
            },
        );
        Ok(notification)
    }

    pub async fn list(&self, recipient_id: UserId) -> Result<Vec<Notification>> {
        self.state.data().notification_list(recipient_id).await
    }

    pub async fn unread_count(&self, recipient_id: UserId) -> Result<u64> {
        self.state
            .data()
            .notification_unread_count(recipient_id)
            .await
    }

    /// Mark a notification acted upon. Idempotent: marking an already-read
    /// record changes nothing and pushes nothing.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        requester_id: UserId,
    ) -> Result<Notification> {
        let data = self.state.data();
        let notification = data.notification_get(id).await?;
        if notification.recipient_id != requester_id {
            return Err(Error::MissingPermissions);
        }
        if notification.read {
            return Ok(notification);
        }
        let updated = data.notification_mark_read(id).await?;
        self.state.fanout.push_to_user(
            requester_id,
            MessageSync::NotificationRead {
                notification_id: id,
            },
        );
        Ok(updated)
    }

    /// Mark a notification as seen in the list. Independent of `read`.
    pub async fn mark_viewed(
        &self,
        id: NotificationId,
        requester_id: UserId,
    ) -> Result<Notification> {
        let data = self.state.data();
        let notification = data.notification_get(id).await?;
        if notification.recipient_id != requester_id {
            return Err(Error::MissingPermissions);
        }
        if notification.viewed {
            return Ok(notification);
        }
        let updated = data.notification_mark_viewed(id).await?;
        self.state.fanout.push_to_user(
            requester_id,
            MessageSync::NotificationViewed {
                notification_id: id,
            },
        );
        Ok(updated)
    }

    /// Mark everything the requester owns as viewed; one summary event is
    /// pushed when anything actually changed.
    pub async fn mark_all_viewed(&self, requester_id: UserId) -> Result<u64> {
        let changed = self
            .state
            .data()
            .notification_mark_all_viewed(requester_id)
            .await?;
        if changed > 0 {
            self.state
                .fanout
                .push_to_user(requester_id, MessageSync::NotificationViewedAll);
        }
        Ok(changed)
    }

    pub async fn delete(&self, id: NotificationId, requester_id: UserId) -> Result<()> {
        let data = self.state.data();
        let notification = data.notification_get(id).await?;
        if notification.recipient_id != requester_id {
            return Err(Error::MissingPermissions);
        }
        data.notification_delete(id).await?;
        self.state.fanout.push_to_user(
            requester_id,
            MessageSync::NotificationDeleted {
                notification_id: id,
            },
        );
        Ok(())
    }

    /// Accept or decline the friend request behind a notification. The
    /// request record is resolved (deleted) either way, and the original
    /// requester is told what happened; on accept the acquaintance pair is
    /// recorded through the store.
    pub async fn resolve_friend_request(
        &self,
        id: NotificationId,
        requester_id: UserId,
        accept: bool,
    ) -> Result<()> {
        let data = self.state.data();
        let notification = data.notification_get(id).await?;
        if notification.recipient_id != requester_id {
            return Err(Error::MissingPermissions);
        }
        let NotificationBody::FriendRequest {
            requester_id: from_id,
        } = notification.body
        else {
            return Err(Error::BadStatic("not a friend request notification"));
        };

        if accept {
            data.acquaintance_put(requester_id, from_id).await?;
        }
        data.notification_delete(id).await?;
        self.state.fanout.push_to_user(
            requester_id,
            MessageSync::NotificationDeleted {
                notification_id: id,
            },
        );

        let user = data.user_get(requester_id).await?;
        let (body, message) = if accept {
            (
                NotificationBody::FriendRequestAccepted {
                    user_id: requester_id,
                },
                format!("{} accepted your friend request", user.name),
            )
        } else {
            (
                NotificationBody::FriendRequestDeclined {
                    user_id: requester_id,
                },
                format!("{} declined your friend request", user.name),
            )
        };
        self.notify(from_id, body, message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test::{connect, recv_sync, test_state};
    use common::types::PostId;

    fn friend_request(from: UserId) -> NotificationBody {
        NotificationBody::FriendRequest { requester_id: from }
    }

    #[tokio::test]
    async fn repeat_friend_requests_merge_into_one_record() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;

        let srv = s.services();
        let first = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "knock".into())
            .await
            .unwrap();
        let second = srv
            .notifications
            .notify(
                recipient.id,
                friend_request(requester.id),
                "knock knock".into(),
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.count, 2);
        assert_eq!(second.message, "knock knock");
        assert!(second.created_at >= first.created_at);

        let list = srv.notifications.list(recipient.id).await.unwrap();
        assert_eq!(list.len(), 1);
        // a merged record still counts once toward the unread total
        assert_eq!(srv.notifications.unread_count(recipient.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reading_a_record_ends_its_aggregation() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;

        let srv = s.services();
        let first = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();
        srv.notifications
            .mark_read(first.id, recipient.id)
            .await
            .unwrap();

        let second = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "again".into())
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.count, 1);
        assert_eq!(srv.notifications.list(recipient.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn viewing_a_record_does_not_end_its_aggregation() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;

        let srv = s.services();
        let first = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();
        srv.notifications
            .mark_viewed(first.id, recipient.id)
            .await
            .unwrap();

        let second = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "again".into())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.count, 2);
    }

    #[tokio::test]
    async fn non_repeatable_kinds_always_insert() {
        let (s, data) = test_state();
        let liker = data.seed_user("liker").await;
        let author = data.seed_user("author").await;
        let post_id = PostId::new();

        let srv = s.services();
        for _ in 0..2 {
            srv.notifications
                .notify(
                    author.id,
                    NotificationBody::Like {
                        user_id: liker.id,
                        post_id,
                    },
                    "someone liked your post".into(),
                )
                .await
                .unwrap();
        }
        assert_eq!(srv.notifications.list(author.id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_events_with_one_key_never_duplicate() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;

        let mut handles = vec![];
        for i in 0..8 {
            let srv = s.services();
            let (recipient_id, requester_id) = (recipient.id, requester.id);
            handles.push(tokio::spawn(async move {
                srv.notifications
                    .notify(
                        recipient_id,
                        NotificationBody::FriendRequest { requester_id },
                        format!("request {i}"),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let srv = s.services();
        let list = srv.notifications.list(recipient.id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].count, 8);
    }

    #[tokio::test]
    async fn mark_read_steps_the_unread_count_down_once() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;
        let mut rx = connect(&s, recipient.id);

        let srv = s.services();
        let notification = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();
        assert!(matches!(
            recv_sync(&mut rx),
            MessageSync::NewNotification { .. }
        ));
        assert_eq!(srv.notifications.unread_count(recipient.id).await.unwrap(), 1);

        let updated = srv
            .notifications
            .mark_read(notification.id, recipient.id)
            .await
            .unwrap();
        assert!(updated.read);
        assert!(!updated.viewed);
        assert_eq!(srv.notifications.unread_count(recipient.id).await.unwrap(), 0);
        assert!(matches!(
            recv_sync(&mut rx),
            MessageSync::NotificationRead { notification_id } if notification_id == notification.id
        ));

        // marking again changes nothing and pushes nothing
        srv.notifications
            .mark_read(notification.id, recipient.id)
            .await
            .unwrap();
        assert_eq!(srv.notifications.unread_count(recipient.id).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn only_the_recipient_may_touch_a_notification() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;
        let stranger = data.seed_user("stranger").await;

        let srv = s.services();
        let notification = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();

        let read = srv
            .notifications
            .mark_read(notification.id, stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(read, Error::MissingPermissions));
        let viewed = srv
            .notifications
            .mark_viewed(notification.id, stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(viewed, Error::MissingPermissions));
        let deleted = srv
            .notifications
            .delete(notification.id, stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(deleted, Error::MissingPermissions));

        let missing = srv
            .notifications
            .mark_read(NotificationId::new(), recipient.id)
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::NotFound));
    }

    #[tokio::test]
    async fn mark_all_viewed_is_one_bulk_step() {
        let (s, data) = test_state();
        let liker = data.seed_user("liker").await;
        let recipient = data.seed_user("recipient").await;
        let mut rx = connect(&s, recipient.id);

        let srv = s.services();
        for _ in 0..3 {
            srv.notifications
                .notify(
                    recipient.id,
                    NotificationBody::Like {
                        user_id: liker.id,
                        post_id: PostId::new(),
                    },
                    "like".into(),
                )
                .await
                .unwrap();
            assert!(matches!(
                recv_sync(&mut rx),
                MessageSync::NewNotification { .. }
            ));
        }

        assert_eq!(
            srv.notifications.mark_all_viewed(recipient.id).await.unwrap(),
            3
        );
        assert!(matches!(
            recv_sync(&mut rx),
            MessageSync::NotificationViewedAll
        ));
        assert!(srv
            .notifications
            .list(recipient.id)
            .await
            .unwrap()
            .iter()
            .all(|n| n.viewed));

        // nothing left to change, nothing pushed
        assert_eq!(
            srv.notifications.mark_all_viewed(recipient.id).await.unwrap(),
            0
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delete_removes_the_record_and_tells_the_recipient() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;
        let mut rx = connect(&s, recipient.id);

        let srv = s.services();
        let notification = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();
        assert!(matches!(
            recv_sync(&mut rx),
            MessageSync::NewNotification { .. }
        ));

        srv.notifications
            .delete(notification.id, recipient.id)
            .await
            .unwrap();
        assert!(srv.notifications.list(recipient.id).await.unwrap().is_empty());
        assert!(matches!(
            recv_sync(&mut rx),
            MessageSync::NotificationDeleted { notification_id }
                if notification_id == notification.id
        ));
    }

    #[tokio::test]
    async fn accepting_a_friend_request_resolves_it_symmetrically() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;

        let srv = s.services();
        let notification = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();

        srv.notifications
            .resolve_friend_request(notification.id, recipient.id, true)
            .await
            .unwrap();

        assert!(srv.notifications.list(recipient.id).await.unwrap().is_empty());
        assert!(data.is_acquainted(requester.id, recipient.id).await);

        let answers = srv.notifications.list(requester.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert!(matches!(
            answers[0].body,
            NotificationBody::FriendRequestAccepted { user_id } if user_id == recipient.id
        ));
    }

    #[tokio::test]
    async fn declining_a_friend_request_records_no_acquaintance() {
        let (s, data) = test_state();
        let requester = data.seed_user("requester").await;
        let recipient = data.seed_user("recipient").await;

        let srv = s.services();
        let notification = srv
            .notifications
            .notify(recipient.id, friend_request(requester.id), "hello".into())
            .await
            .unwrap();

        srv.notifications
            .resolve_friend_request(notification.id, recipient.id, false)
            .await
            .unwrap();

        assert!(!data.is_acquainted(requester.id, recipient.id).await);
        let answers = srv.notifications.list(requester.id).await.unwrap();
        assert!(matches!(
            answers[0].body,
            NotificationBody::FriendRequestDeclined { user_id } if user_id == recipient.id
        ));
    }

    #[tokio::test]
    async fn resolving_a_non_request_notification_is_rejected() {
        let (s, data) = test_state();
        let liker = data.seed_user("liker").await;
        let recipient = data.seed_user("recipient").await;

        let srv = s.services();
        let notification = srv
            .notifications
            .notify(
                recipient.id,
                NotificationBody::Like {
                    user_id: liker.id,
                    post_id: PostId::new(),
                },
                "like".into(),
            )
            .await
            .unwrap();

        let err = srv
            .notifications
            .resolve_friend_request(notification.id, recipient.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadStatic(_)));
    }
}
