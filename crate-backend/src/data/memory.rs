//! In-memory implementation of the store, used by the test suite. A single
//! mutex around the whole state stands in for the per-statement atomicity
//! the database gives the Postgres implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use common::types::{
    Conversation, DirectMessage, Group, GroupId, GroupMessage, GroupUnread, MessageId,
    Notification, NotificationId, NotificationKind, SessionToken, Time, User, UserId,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::data::{
    Data, DataAuth, DataGroup, DataMessage, DataNotification, DataUnread, DataUser,
    DbDirectMessageCreate, DbGroupMessageCreate,
};
use crate::error::{Error, Result};

#[derive(Default)]
struct MemoryInner {
    users: HashMap<UserId, User>,
    sessions: HashMap<String, UserId>,
    acquaintances: Vec<(UserId, UserId)>,
    groups: HashMap<GroupId, Group>,
    group_members: HashMap<GroupId, Vec<UserId>>,
    direct_messages: Vec<DirectMessage>,
    group_messages: Vec<GroupMessage>,
    unreads: HashMap<(GroupId, UserId), u64>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct Memory {
    inner: Mutex<MemoryInner>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(&self, name: &str) -> User {
        let user = User {
            id: UserId::new(),
            name: name.to_owned(),
            email: format!("{name}@example.com"),
            banned: false,
        };
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.id, user.clone());
        user
    }

    pub async fn seed_session(&self, user_id: UserId, token: &str) {
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(token.to_owned(), user_id);
    }

    pub async fn seed_group(&self, name: &str, creator_id: UserId, members: &[UserId]) -> Group {
        let group = Group {
            id: GroupId::new(),
            name: name.to_owned(),
            creator_id,
        };
        let mut inner = self.inner.lock().await;
        inner.groups.insert(group.id, group.clone());
        inner.group_members.insert(group.id, members.to_vec());
        group
    }

    pub async fn ban_user(&self, user_id: UserId) {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.banned = true;
        }
    }

    pub async fn is_acquainted(&self, user_a_id: UserId, user_b_id: UserId) -> bool {
        let pair = canonical(user_a_id, user_b_id);
        self.inner.lock().await.acquaintances.contains(&pair)
    }
}

fn canonical(a: UserId, b: UserId) -> (UserId, UserId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Data for Memory {}

#[async_trait]
impl DataAuth for Memory {
    async fn session_user_by_token(&self, token: &SessionToken) -> Result<User> {
        let inner = self.inner.lock().await;
        let user_id = inner.sessions.get(&token.0).ok_or(Error::NotFound)?;
        inner.users.get(user_id).cloned().ok_or(Error::NotFound)
    }
}

#[async_trait]
impl DataUser for Memory {
    async fn user_get(&self, user_id: UserId) -> Result<User> {
        let inner = self.inner.lock().await;
        inner.users.get(&user_id).cloned().ok_or(Error::NotFound)
    }

    async fn acquaintance_put(&self, user_a_id: UserId, user_b_id: UserId) -> Result<()> {
        let pair = canonical(user_a_id, user_b_id);
        let mut inner = self.inner.lock().await;
        if !inner.acquaintances.contains(&pair) {
            inner.acquaintances.push(pair);
        }
        Ok(())
    }
}

#[async_trait]
impl DataGroup for Memory {
    async fn group_get(&self, group_id: GroupId) -> Result<Group> {
        let inner = self.inner.lock().await;
        inner.groups.get(&group_id).cloned().ok_or(Error::NotFound)
    }

    async fn group_members(&self, group_id: GroupId) -> Result<Vec<UserId>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .group_members
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn group_is_member(&self, group_id: GroupId, user_id: UserId) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner
            .group_members
            .get(&group_id)
            .is_some_and(|members| members.contains(&user_id)))
    }
}

#[async_trait]
impl DataMessage for Memory {
    async fn direct_message_create(&self, create: DbDirectMessageCreate) -> Result<DirectMessage> {
        let message = DirectMessage {
            id: MessageId::new(),
            sender_id: create.sender_id,
            receiver_id: create.receiver_id,
            content: create.content,
            created_at: Time::now_utc(),
        };
        self.inner.lock().await.direct_messages.push(message.clone());
        Ok(message)
    }

    async fn group_message_create(&self, create: DbGroupMessageCreate) -> Result<GroupMessage> {
        let message = GroupMessage {
            id: MessageId::new(),
            group_id: create.group_id,
            sender_id: create.sender_id,
            content: create.content,
            created_at: Time::now_utc(),
        };
        self.inner.lock().await.group_messages.push(message.clone());
        Ok(message)
    }

    async fn direct_history(
        &self,
        user_a_id: UserId,
        user_b_id: UserId,
    ) -> Result<Vec<DirectMessage>> {
        let inner = self.inner.lock().await;
        let mut messages: Vec<_> = inner
            .direct_messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a_id && m.receiver_id == user_b_id)
                    || (m.sender_id == user_b_id && m.receiver_id == user_a_id)
            })
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }

    async fn group_history(&self, group_id: GroupId) -> Result<Vec<GroupMessage>> {
        let inner = self.inner.lock().await;
        let mut messages: Vec<_> = inner
            .group_messages
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }

    async fn conversation_list(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        let inner = self.inner.lock().await;
        let mut latest: HashMap<UserId, DirectMessage> = HashMap::new();
        for message in &inner.direct_messages {
            let counterpart = if message.sender_id == user_id {
                message.receiver_id
            } else if message.receiver_id == user_id {
                message.sender_id
            } else {
                continue;
            };
            let newer = latest
                .get(&counterpart)
                .is_none_or(|prev| (prev.created_at, prev.id) < (message.created_at, message.id));
            if newer {
                latest.insert(counterpart, message.clone());
            }
        }
        let mut conversations = Vec::new();
        for (counterpart_id, message) in latest {
            let counterpart = inner
                .users
                .get(&counterpart_id)
                .cloned()
                .ok_or(Error::NotFound)?;
            conversations.push(Conversation {
                counterpart,
                latest_message: message,
            });
        }
        conversations.sort_by_key(|c| (c.latest_message.created_at, c.latest_message.id));
        conversations.reverse();
        Ok(conversations)
    }
}

#[async_trait]
impl DataUnread for Memory {
    async fn unread_increment_members(&self, group_id: GroupId, except: UserId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let members = inner
            .group_members
            .get(&group_id)
            .cloned()
            .unwrap_or_default();
        for member in members {
            if member == except {
                continue;
            }
            *inner.unreads.entry((group_id, member)).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn unread_reset(&self, group_id: GroupId, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.unreads.insert((group_id, user_id), 0);
        Ok(())
    }

    async fn unread_list(&self, user_id: UserId) -> Result<Vec<GroupUnread>> {
        let inner = self.inner.lock().await;
        let mut unreads: Vec<_> = inner
            .unreads
            .iter()
            .filter(|((_, member), _)| *member == user_id)
            .map(|((group_id, member), count)| GroupUnread {
                group_id: *group_id,
                user_id: *member,
                count: *count,
            })
            .collect();
        unreads.sort_by_key(|u| u.group_id.into_inner());
        Ok(unreads)
    }
}

#[async_trait]
impl DataNotification for Memory {
    async fn notification_insert(&self, notification: Notification) -> Result<()> {
        self.inner.lock().await.notifications.push(notification);
        Ok(())
    }

    async fn notification_get(&self, id: NotificationId) -> Result<Notification> {
        let inner = self.inner.lock().await;
        inner
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn notification_find_unread(
        &self,
        recipient_id: UserId,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> Result<Option<Notification>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|n| {
                n.recipient_id == recipient_id
                    && n.body.kind() == kind
                    && n.body.related_id() == related_id
                    && !n.read
            })
            .max_by_key(|n| (n.created_at, n.id))
            .cloned())
    }

    async fn notification_bump(
        &self,
        id: NotificationId,
        message: &str,
        at: Time,
    ) -> Result<Notification> {
        let mut inner = self.inner.lock().await;
        let notification = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotFound)?;
        notification.count += 1;
        notification.message = message.to_owned();
        notification.created_at = at;
        Ok(notification.clone())
    }

    async fn notification_list(&self, recipient_id: UserId) -> Result<Vec<Notification>> {
        let inner = self.inner.lock().await;
        let mut notifications: Vec<_> = inner
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        notifications.sort_by_key(|n| (n.created_at, n.id));
        notifications.reverse();
        Ok(notifications)
    }

    async fn notification_mark_read(&self, id: NotificationId) -> Result<Notification> {
        let mut inner = self.inner.lock().await;
        let notification = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotFound)?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn notification_mark_viewed(&self, id: NotificationId) -> Result<Notification> {
        let mut inner = self.inner.lock().await;
        let notification = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotFound)?;
        notification.viewed = true;
        Ok(notification.clone())
    }

    async fn notification_mark_all_viewed(&self, recipient_id: UserId) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let mut changed = 0;
        for notification in inner
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.viewed)
        {
            notification.viewed = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn notification_unread_count(&self, recipient_id: UserId) -> Result<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as u64)
    }

    async fn notification_delete(&self, id: NotificationId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let before = inner.notifications.len();
        inner.notifications.retain(|n| n.id != id);
        if inner.notifications.len() == before {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DbDirectMessageCreate;

    #[tokio::test]
    async fn direct_history_is_ascending_and_symmetric() {
        let data = Memory::new();
        let alice = data.seed_user("alice").await;
        let bob = data.seed_user("bob").await;
        for content in ["one", "two", "three"] {
            data.direct_message_create(DbDirectMessageCreate {
                sender_id: alice.id,
                receiver_id: bob.id,
                content: content.to_owned(),
            })
            .await
            .unwrap();
        }

        let history = data.direct_history(alice.id, bob.id).await.unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert!(history
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));

        let mirrored = data.direct_history(bob.id, alice.id).await.unwrap();
        assert_eq!(history, mirrored);
    }

    #[tokio::test]
    async fn conversation_list_keeps_one_entry_per_counterpart() {
        let data = Memory::new();
        let me = data.seed_user("me").await;
        let bob = data.seed_user("bob").await;
        let carol = data.seed_user("carol").await;

        for (from, to, content) in [
            (me.id, bob.id, "hi bob"),
            (bob.id, me.id, "hi back"),
            (carol.id, me.id, "hi from carol"),
        ] {
            data.direct_message_create(DbDirectMessageCreate {
                sender_id: from,
                receiver_id: to,
                content: content.to_owned(),
            })
            .await
            .unwrap();
        }

        let conversations = data.conversation_list(me.id).await.unwrap();
        assert_eq!(conversations.len(), 2);
        // most recent exchange first
        assert_eq!(conversations[0].counterpart.id, carol.id);
        assert_eq!(conversations[0].latest_message.content, "hi from carol");
        assert_eq!(conversations[1].counterpart.id, bob.id);
        assert_eq!(conversations[1].latest_message.content, "hi back");
    }
}
