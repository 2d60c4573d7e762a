use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;
use wws_wire::ChannelKind;

use crate::client::ClientEndpoint;

/// A single rendezvous slot, created by `/create` and destroyed on first
/// disconnection of either occupant. Lives only inside the hub's event loop
/// task; nothing else ever touches this table directly.
pub struct Channel {
    pub id: Uuid,
    pub kind: ChannelKind,
    pub proxy: Option<Arc<ClientEndpoint>>,
    pub tunnel: Option<Arc<ClientEndpoint>>,
    pub created_at: Instant,
}

impl Channel {
    pub fn new(id: Uuid, kind: ChannelKind) -> Self {
        Self {
            id,
            kind,
            proxy: None,
            tunnel: None,
            created_at: Instant::now(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.proxy.is_some() && self.tunnel.is_some()
    }
}
