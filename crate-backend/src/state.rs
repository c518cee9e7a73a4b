use std::{
    ops::Deref,
    sync::{Arc, Weak},
};

use common::types::{GroupId, MessageSync, UserId};

use crate::{
    config::Config, data::Data, fanout::Fanout, registry::Registry, services::Services, Result,
};

pub struct ServerStateInner {
    pub config: Config,
    data: Arc<dyn Data>,
    pub services: Weak<Services>,
    pub registry: Arc<Registry>,
    pub fanout: Fanout,
}

pub struct ServerState {
    pub inner: Arc<ServerStateInner>,
    pub services: Arc<Services>,
}

impl ServerStateInner {
    pub fn data(&self) -> Arc<dyn Data> {
        self.data.clone()
    }

    pub fn services(&self) -> Arc<Services> {
        self.services
            .upgrade()
            .expect("services should always exist while serverstateinner is alive")
    }

    /// Deliver an event to every live connection of each current group
    /// member, except `exclude` (a sender already holds the authoritative
    /// response to its own request).
    pub async fn push_to_group(
        &self,
        group_id: GroupId,
        exclude: Option<UserId>,
        msg: MessageSync,
    ) -> Result<()> {
        let members = self.data().group_members(group_id).await?;
        for member in members {
            if Some(member) == exclude {
                continue;
            }
            self.fanout.push_to_user(member, msg.clone());
        }
        Ok(())
    }
}

impl ServerState {
    pub fn new(config: Config, data: Arc<dyn Data>) -> Self {
        let registry = Arc::new(Registry::new());
        let services = Arc::new_cyclic(|weak| {
            let inner = Arc::new(ServerStateInner {
                config,
                data,
                services: weak.to_owned(),
                registry: registry.clone(),
                fanout: Fanout::new(registry),
            });
            Services::new(inner)
        });
        Self {
            inner: services.state.clone(),
            services,
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn data(&self) -> Arc<dyn Data> {
        self.inner.data()
    }

    pub fn services(&self) -> Arc<Services> {
        self.services.clone()
    }
}

impl Deref for ServerState {
    type Target = ServerStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use common::types::{ConnectionId, MessageEnvelope, MessagePayload, MessageSync, UserId};
    use tokio::sync::mpsc;

    use crate::config::Config;
    use crate::data::memory::Memory;
    use crate::ServerState;

    pub fn test_state() -> (Arc<ServerState>, Arc<Memory>) {
        let data = Arc::new(Memory::new());
        let config = Config {
            rust_log: "info".to_owned(),
            database_url: String::new(),
            listen: Default::default(),
        };
        (Arc::new(ServerState::new(config, data.clone())), data)
    }

    /// Register a fake live connection for the user, returning the receiving
    /// half its websocket worker would drain.
    pub fn connect(
        s: &ServerState,
        user_id: UserId,
    ) -> mpsc::UnboundedReceiver<MessageEnvelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        s.registry.register(user_id, ConnectionId::new(), tx);
        rx
    }

    /// Pop the next queued event, asserting it is a sync payload.
    pub fn recv_sync(rx: &mut mpsc::UnboundedReceiver<MessageEnvelope>) -> MessageSync {
        match rx.try_recv().expect("expected a queued event").payload {
            MessagePayload::Sync { data } => data,
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
