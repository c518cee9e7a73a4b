use std::sync::Arc;

use common::types::{
    Conversation, DirectMessage, GroupId, GroupMessage, GroupUnread, MessageCreate, MessageSync,
    NotificationBody, UserId,
};
use tracing::warn;
use validator::Validate;

use crate::data::{DbDirectMessageCreate, DbGroupMessageCreate};
use crate::{Error, Result, ServerStateInner};

pub struct ServiceMessages {
    state: Arc<ServerStateInner>,
}

impl ServiceMessages {
    pub fn new(state: Arc<ServerStateInner>) -> Self {
        Self { state }
    }

    /// Send a direct message. The write is durable before anything is
    /// pushed; the receiver additionally gets a message alert, merged into
    /// an existing unread alert from the same sender if there is one.
    pub async fn send_direct(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        json: MessageCreate,
    ) -> Result<DirectMessage> {
        json.validate()?;
        let content = json.content.trim();
        if content.is_empty() {
            return Err(Error::BadStatic("message content must not be empty"));
        }

        let s = &self.state;
        let data = s.data();
        let receiver = data.user_get(receiver_id).await?;
        let sender = data.user_get(sender_id).await?;

        let message = data
            .direct_message_create(DbDirectMessageCreate {
                sender_id,
                receiver_id,
                content: content.to_owned(),
            })
            .await?;

        s.fanout.push_to_user(
            receiver.id,
            MessageSync::ReceiveMessage {
                message: message.clone().into(),
            },
        );

        let notified = s
            .services()
            .notifications
            .notify(
                receiver.id,
                NotificationBody::NewMessage {
                    sender_id,
                    message_id: message.id,
                },
                format!("New message from {}", sender.name),
            )
            .await;
        if let Err(err) = notified {
            // the message itself is durable and acknowledged; the alert is
            // recoverable from history
            warn!("failed to record message alert for {receiver_id}: {err}");
        }

        Ok(message)
    }

    /// Send a message to a group. Every current member except the sender
    /// gets an unread increment, a live push, and a group message alert.
    pub async fn send_group(
        &self,
        sender_id: UserId,
        group_id: GroupId,
        json: MessageCreate,
    ) -> Result<GroupMessage> {
        json.validate()?;
        let content = json.content.trim();
        if content.is_empty() {
            return Err(Error::BadStatic("message content must not be empty"));
        }

        let s = &self.state;
        let data = s.data();
        let group = data.group_get(group_id).await?;
        if !data.group_is_member(group_id, sender_id).await? {
            return Err(Error::MissingPermissions);
        }

        let message = data
            .group_message_create(DbGroupMessageCreate {
                group_id,
                sender_id,
                content: content.to_owned(),
            })
            .await?;

        data.unread_increment_members(group_id, sender_id).await?;

        if let Err(err) = s
            .push_to_group(
                group_id,
                Some(sender_id),
                MessageSync::ReceiveMessage {
                    message: message.clone().into(),
                },
            )
            .await
        {
            warn!("failed to push group message {}: {err}", message.id);
        }

        let srv = s.services();
        for member in data.group_members(group_id).await? {
            if member == sender_id {
                continue;
            }
            let notified = srv
                .notifications
                .notify(
                    member,
                    NotificationBody::NewGroupMessage {
                        group_id,
                        message_id: message.id,
                    },
                    format!("New message in {}", group.name),
                )
                .await;
            if let Err(err) = notified {
                warn!("failed to record group message alert for {member}: {err}");
            }
        }

        Ok(message)
    }

    /// Acknowledge a group: the member's unread counter goes back to zero.
    /// Idempotent.
    pub async fn reset_unread(&self, group_id: GroupId, user_id: UserId) -> Result<()> {
        self.state.data().unread_reset(group_id, user_id).await
    }

    pub async fn unread_list(&self, user_id: UserId) -> Result<Vec<GroupUnread>> {
        self.state.data().unread_list(user_id).await
    }

    pub async fn conversations(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        self.state.data().conversation_list(user_id).await
    }

    pub async fn direct_history(
        &self,
        user_id: UserId,
        counterpart_id: UserId,
    ) -> Result<Vec<DirectMessage>> {
        let data = self.state.data();
        data.user_get(counterpart_id).await?;
        data.direct_history(user_id, counterpart_id).await
    }

    /// Group history is only visible to current members.
    pub async fn group_history(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Vec<GroupMessage>> {
        let data = self.state.data();
        data.group_get(group_id).await?;
        if !data.group_is_member(group_id, user_id).await? {
            return Err(Error::MissingPermissions);
        }
        data.group_history(group_id).await
    }
}
