use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{GroupId, MessageId, Time, User, UserId};

/// A message between two users. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DirectMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: Time,
}

/// A message in a group chat, visible to all current members. Immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupMessage {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: Time,
}

/// Either message shape, as carried over the realtime channel. The two are
/// distinguished by their fields (`receiver_id` vs `group_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ChatMessage {
    Direct(DirectMessage),
    Group(GroupMessage),
}

impl ChatMessage {
    pub fn id(&self) -> MessageId {
        match self {
            ChatMessage::Direct(m) => m.id,
            ChatMessage::Group(m) => m.id,
        }
    }

    pub fn sender_id(&self) -> UserId {
        match self {
            ChatMessage::Direct(m) => m.sender_id,
            ChatMessage::Group(m) => m.sender_id,
        }
    }

    pub fn created_at(&self) -> Time {
        match self {
            ChatMessage::Direct(m) => m.created_at,
            ChatMessage::Group(m) => m.created_at,
        }
    }
}

impl From<DirectMessage> for ChatMessage {
    fn from(value: DirectMessage) -> Self {
        ChatMessage::Direct(value)
    }
}

impl From<GroupMessage> for ChatMessage {
    fn from(value: GroupMessage) -> Self {
        ChatMessage::Group(value)
    }
}

/// Request body for sending a direct or group message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct MessageCreate {
    #[validate(length(min = 1, max = 4096))]
    pub content: String,
}

/// One entry of a user's conversation list: the latest direct message
/// exchanged with each distinct counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub counterpart: User,
    pub latest_message: DirectMessage,
}

/// Per-member unread counter for a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupUnread {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub count: u64,
}
