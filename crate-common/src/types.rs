pub mod group;
pub mod ids;
pub mod message;
pub mod notification;
pub mod reconcile;
pub mod sync;
pub mod time;
pub mod user;

pub use group::Group;
pub use ids::{
    CommentId, ConnectionId, GroupId, MessageId, NotificationId, PostId, UserId,
};
pub use message::{
    ChatMessage, Conversation, DirectMessage, GroupMessage, GroupUnread, MessageCreate,
};
pub use notification::{Notification, NotificationBody, NotificationKind};
pub use sync::{MessageClient, MessageEnvelope, MessagePayload, MessageSync};
pub use time::Time;
pub use user::{SessionToken, User};
