use std::sync::Arc;

use messages::ServiceMessages;
use notifications::ServiceNotifications;

use crate::ServerStateInner;

pub mod messages;
pub mod notifications;

pub struct Services {
    pub(crate) state: Arc<ServerStateInner>,
    pub messages: ServiceMessages,
    pub notifications: ServiceNotifications,
}

impl Services {
    pub fn new(state: Arc<ServerStateInner>) -> Self {
        Self {
            messages: ServiceMessages::new(state.clone()),
            notifications: ServiceNotifications::new(state.clone()),
            state,
        }
    }
}
