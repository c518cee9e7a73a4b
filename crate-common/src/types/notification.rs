use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CommentId, GroupId, MessageId, NotificationId, PostId, Time, UserId};

/// What a notification is about. Each kind carries only the references
/// relevant to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationBody {
    Like {
        user_id: UserId,
        post_id: PostId,
    },
    Comment {
        user_id: UserId,
        post_id: PostId,
        comment_id: CommentId,
    },
    NewMessage {
        sender_id: UserId,
        message_id: MessageId,
    },
    NewGroupMessage {
        group_id: GroupId,
        message_id: MessageId,
    },
    FriendRequest {
        requester_id: UserId,
    },
    FriendRequestAccepted {
        user_id: UserId,
    },
    FriendRequestDeclined {
        user_id: UserId,
    },
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    NewMessage,
    NewGroupMessage,
    FriendRequest,
    FriendRequestAccepted,
    FriendRequestDeclined,
}

impl NotificationBody {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationBody::Like { .. } => NotificationKind::Like,
            NotificationBody::Comment { .. } => NotificationKind::Comment,
            NotificationBody::NewMessage { .. } => NotificationKind::NewMessage,
            NotificationBody::NewGroupMessage { .. } => NotificationKind::NewGroupMessage,
            NotificationBody::FriendRequest { .. } => NotificationKind::FriendRequest,
            NotificationBody::FriendRequestAccepted { .. } => {
                NotificationKind::FriendRequestAccepted
            }
            NotificationBody::FriendRequestDeclined { .. } => {
                NotificationKind::FriendRequestDeclined
            }
        }
    }

    /// The counterpart this notification points back at: the acting user,
    /// or the group for group message alerts.
    pub fn related_id(&self) -> Uuid {
        match self {
            NotificationBody::Like { user_id, .. } => user_id.into_inner(),
            NotificationBody::Comment { user_id, .. } => user_id.into_inner(),
            NotificationBody::NewMessage { sender_id, .. } => sender_id.into_inner(),
            NotificationBody::NewGroupMessage { group_id, .. } => group_id.into_inner(),
            NotificationBody::FriendRequest { requester_id } => requester_id.into_inner(),
            NotificationBody::FriendRequestAccepted { user_id } => user_id.into_inner(),
            NotificationBody::FriendRequestDeclined { user_id } => user_id.into_inner(),
        }
    }

    /// Whether repeat notifications with the same (kind, related) key merge
    /// into an existing unread record instead of inserting a new one.
    pub fn aggregates(&self) -> bool {
        matches!(
            self,
            NotificationBody::NewMessage { .. } | NotificationBody::FriendRequest { .. }
        )
    }
}

/// A unit of stuff that may show up in a user's inbox or be pushed to them
/// live.
///
/// `read` tracks whether the user acted on the notification; `viewed`
/// tracks the lighter "seen in the list" state. The two are independent:
/// neither implies the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,

    #[serde(flatten)]
    pub body: NotificationBody,

    /// display text, e.g. "Riley sent you a message"
    pub message: String,

    /// how many events merged into this record
    pub count: u32,

    pub read: bool,
    pub viewed: bool,
    pub created_at: Time,
}

impl Notification {
    pub fn new(recipient_id: UserId, body: NotificationBody, message: String) -> Self {
        Self {
            id: NotificationId::new(),
            recipient_id,
            body,
            message,
            count: 1,
            read: false,
            viewed: false,
            created_at: Time::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_is_limited_to_repeatable_kinds() {
        let sender = UserId::new();
        let msg = NotificationBody::NewMessage {
            sender_id: sender,
            message_id: MessageId::new(),
        };
        let req = NotificationBody::FriendRequest {
            requester_id: sender,
        };
        let like = NotificationBody::Like {
            user_id: sender,
            post_id: PostId::new(),
        };
        assert!(msg.aggregates());
        assert!(req.aggregates());
        assert!(!like.aggregates());
        assert_eq!(msg.related_id(), sender.into_inner());
        assert_eq!(req.related_id(), sender.into_inner());
    }

    #[test]
    fn body_serializes_with_a_kind_tag() {
        let body = NotificationBody::FriendRequest {
            requester_id: UserId::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "friend_request");
        assert!(json.get("requester_id").is_some());
        assert!(json.get("post_id").is_none());
    }
}
