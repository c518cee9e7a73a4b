use async_trait::async_trait;
use common::types::{
    Conversation, DirectMessage, Group, GroupId, GroupMessage, GroupUnread, Notification,
    NotificationId, NotificationKind, SessionToken, Time, User, UserId,
};
use uuid::Uuid;

use crate::error::Result;

pub mod memory;
pub mod postgres;

pub trait Data:
    DataAuth + DataUser + DataGroup + DataMessage + DataUnread + DataNotification + Send + Sync
{
}

#[async_trait]
pub trait DataAuth {
    /// Resolve a bearer token to its user. NotFound if the token is unknown.
    async fn session_user_by_token(&self, token: &SessionToken) -> Result<User>;
}

#[async_trait]
pub trait DataUser {
    async fn user_get(&self, user_id: UserId) -> Result<User>;

    /// Record an accepted friendship. The relationship lifecycle itself is
    /// owned by the surrounding application; this is the write seam it
    /// exposes to us.
    async fn acquaintance_put(&self, user_a_id: UserId, user_b_id: UserId) -> Result<()>;
}

#[async_trait]
pub trait DataGroup {
    async fn group_get(&self, group_id: GroupId) -> Result<Group>;
    async fn group_members(&self, group_id: GroupId) -> Result<Vec<UserId>>;
    async fn group_is_member(&self, group_id: GroupId, user_id: UserId) -> Result<bool>;
}

#[derive(Debug)]
pub struct DbDirectMessageCreate {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
}

#[derive(Debug)]
pub struct DbGroupMessageCreate {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub content: String,
}

#[async_trait]
pub trait DataMessage {
    async fn direct_message_create(&self, create: DbDirectMessageCreate) -> Result<DirectMessage>;
    async fn group_message_create(&self, create: DbGroupMessageCreate) -> Result<GroupMessage>;

    /// Everything the two users exchanged, ascending by (created_at, id).
    async fn direct_history(&self, user_a_id: UserId, user_b_id: UserId)
        -> Result<Vec<DirectMessage>>;

    /// Everything sent in the group, ascending by (created_at, id).
    async fn group_history(&self, group_id: GroupId) -> Result<Vec<GroupMessage>>;

    /// The latest message per distinct counterpart, most recent first.
    async fn conversation_list(&self, user_id: UserId) -> Result<Vec<Conversation>>;
}

#[async_trait]
pub trait DataUnread {
    /// Add one to the unread counter of every current member except
    /// `except`, in a single atomic step.
    async fn unread_increment_members(&self, group_id: GroupId, except: UserId) -> Result<()>;

    /// Set one member's counter back to zero. Idempotent.
    async fn unread_reset(&self, group_id: GroupId, user_id: UserId) -> Result<()>;

    async fn unread_list(&self, user_id: UserId) -> Result<Vec<GroupUnread>>;
}

#[async_trait]
pub trait DataNotification {
    async fn notification_insert(&self, notification: Notification) -> Result<()>;
    async fn notification_get(&self, id: NotificationId) -> Result<Notification>;

    /// The recipient's unread notification matching (kind, related), if any.
    async fn notification_find_unread(
        &self,
        recipient_id: UserId,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> Result<Option<Notification>>;

    /// Merge a repeat event into an existing record: count + 1, fresh
    /// display text and timestamp.
    async fn notification_bump(
        &self,
        id: NotificationId,
        message: &str,
        at: Time,
    ) -> Result<Notification>;

    /// The recipient's notifications, newest first.
    async fn notification_list(&self, recipient_id: UserId) -> Result<Vec<Notification>>;

    async fn notification_mark_read(&self, id: NotificationId) -> Result<Notification>;
    async fn notification_mark_viewed(&self, id: NotificationId) -> Result<Notification>;

    /// Mark every unviewed notification of the recipient viewed, returning
    /// how many records changed.
    async fn notification_mark_all_viewed(&self, recipient_id: UserId) -> Result<u64>;

    async fn notification_unread_count(&self, recipient_id: UserId) -> Result<u64>;
    async fn notification_delete(&self, id: NotificationId) -> Result<()>;
}
