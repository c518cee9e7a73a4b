use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use common::types::{ConnectionId, MessageClient, MessageEnvelope, MessagePayload, User};
use tokio::time::Instant;
use tracing::trace;

use crate::error::{Error, Result};
use crate::registry::ConnectionHandle;
use crate::ServerState;

pub const HEARTBEAT_TIME: Duration = Duration::from_secs(30);
pub const CLOSE_TIME: Duration = Duration::from_secs(10);

pub enum Timeout {
    Ping(Instant),
    Close(Instant),
}

impl Timeout {
    pub fn for_ping() -> Self {
        Timeout::Ping(Instant::now() + HEARTBEAT_TIME)
    }

    pub fn for_close() -> Self {
        Timeout::Close(Instant::now() + CLOSE_TIME)
    }

    pub fn get_instant(&self) -> Instant {
        match self {
            Timeout::Ping(instant) => *instant,
            Timeout::Close(instant) => *instant,
        }
    }
}

/// Per-websocket state machine. A connection starts unauthenticated; a
/// valid Hello registers it under its user, after which events enqueued by
/// the fan-out arrive on the worker's queue until the socket goes away.
pub struct Connection {
    state: ConnectionState,
    s: Arc<ServerState>,
    id: ConnectionId,
    handle: ConnectionHandle,
}

#[derive(Debug, Clone)]
enum ConnectionState {
    Unauthed,
    Authenticated { user: User },
}

impl Connection {
    pub fn new(s: Arc<ServerState>, handle: ConnectionHandle) -> Self {
        Self {
            state: ConnectionState::Unauthed,
            s,
            id: ConnectionId::new(),
            handle,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn handle_message(
        &mut self,
        ws_msg: Message,
        ws: &mut WebSocket,
        timeout: &mut Timeout,
    ) -> Result<()> {
        let msg = match ws_msg {
            Message::Text(text) => serde_json::from_str::<MessageClient>(&text)?,
            _ => return Ok(()),
        };
        self.handle_message_client(msg, ws, timeout).await
    }

    async fn handle_message_client(
        &mut self,
        msg: MessageClient,
        ws: &mut WebSocket,
        timeout: &mut Timeout,
    ) -> Result<()> {
        trace!("{msg:#?}");
        match msg {
            MessageClient::Hello { token } => {
                if let ConnectionState::Authenticated { .. } = self.state {
                    return Err(Error::BadStatic("already joined"));
                }
                let user = self
                    .s
                    .data()
                    .session_user_by_token(&token)
                    .await
                    .map_err(|err| match err {
                        Error::NotFound => Error::MissingAuth,
                        other => other,
                    })?;
                if user.banned {
                    return Err(Error::MissingPermissions);
                }

                self.s.registry.register(user.id, self.id, self.handle.clone());

                let ready = MessageEnvelope {
                    payload: MessagePayload::Ready {
                        user: user.clone(),
                        conn: self.id,
                    },
                };
                ws.send(serialize(&ready)).await?;
                self.state = ConnectionState::Authenticated { user };
            }
            MessageClient::Pong => {
                if let ConnectionState::Unauthed = self.state {
                    return Err(Error::UnauthSession);
                }
                *timeout = Timeout::for_ping();
            }
        }
        Ok(())
    }

    /// Drop the connection from the registry. Events pushed after this are
    /// lost for this connection and recovered through history on the next
    /// join.
    pub fn close(&self) {
        if let ConnectionState::Authenticated { user } = &self.state {
            trace!("closing connection {} of {}", self.id, user.id);
        }
        self.s.registry.unregister(self.id);
    }
}

pub fn serialize(msg: &MessageEnvelope) -> Message {
    Message::text(
        serde_json::to_string(msg).expect("server messages should always be able to be serialized"),
    )
}
