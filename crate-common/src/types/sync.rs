use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ChatMessage, ConnectionId, Notification, NotificationId, SessionToken, User};

/// Messages a client may send over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum MessageClient {
    /// initial message; authenticates and registers the connection
    Hello { token: SessionToken },

    /// heartbeat
    Pong,
}

/// Envelope for everything the server sends over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageEnvelope {
    #[serde(flatten)]
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op")]
pub enum MessagePayload {
    /// heartbeat; the client must answer with Pong
    Ping,

    /// data to keep the local copy of state in sync with the server
    Sync { data: MessageSync },

    /// some kind of error
    Error { error: String },

    /// successfully joined
    Ready { user: User, conn: ConnectionId },
}

/// Events fanned out to a recipient's live connections.
///
/// Delivery is at most once per connection per event; anything missed is
/// recovered through the history endpoints, so clients merge by id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum MessageSync {
    ReceiveMessage {
        message: ChatMessage,
    },

    NewNotification {
        notification: Notification,
    },

    NotificationRead {
        notification_id: NotificationId,
    },

    NotificationViewed {
        notification_id: NotificationId,
    },

    /// every notification of the recipient was marked viewed; clients
    /// refetch rather than patching records one by one
    NotificationViewedAll,

    NotificationDeleted {
        notification_id: NotificationId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DirectMessage, MessageId, Time, UserId};

    #[test]
    fn envelope_flattens_the_op_tag() {
        let env = MessageEnvelope {
            payload: MessagePayload::Sync {
                data: MessageSync::ReceiveMessage {
                    message: ChatMessage::Direct(DirectMessage {
                        id: MessageId::new(),
                        sender_id: UserId::new(),
                        receiver_id: UserId::new(),
                        content: "hi".into(),
                        created_at: Time::now_utc(),
                    }),
                },
            },
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["op"], "Sync");
        assert_eq!(json["data"]["type"], "ReceiveMessage");
        assert_eq!(json["data"]["message"]["content"], "hi");
    }

    #[test]
    fn hello_round_trips() {
        let msg: MessageClient =
            serde_json::from_str(r#"{"type":"Hello","token":"sekrit"}"#).unwrap();
        match msg {
            MessageClient::Hello { token } => assert_eq!(token.0, "sekrit"),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
