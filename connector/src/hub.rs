use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use wws_wire::{ChannelKind, Role, TAR_TRAP_DELAY};

use crate::channel::Channel;
use crate::client::ClientEndpoint;
use crate::handlers;

enum HubEvent {
    Create(Uuid, ChannelKind),
    Register(Arc<ClientEndpoint>),
    Disconnected(Arc<ClientEndpoint>),
    CountChannels(tokio::sync::oneshot::Sender<usize>),
}

/// Cheaply cloneable front for the hub's event loop task. The channel table
/// itself never leaves that task — everything else, including the handlers
/// spawned once a channel attaches, only ever reaches it through this queue.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
}

impl HubHandle {
    pub fn create(&self, id: Uuid, kind: ChannelKind) {
        let _ = self.tx.send(HubEvent::Create(id, kind));
    }

    pub fn register(&self, client: Arc<ClientEndpoint>) {
        let _ = self.tx.send(HubEvent::Register(client));
    }

    pub fn disconnected(&self, client: Arc<ClientEndpoint>) {
        let _ = self.tx.send(HubEvent::Disconnected(client));
    }

    /// Used by `GET /healthz`. Goes through the same event queue as every
    /// other hub operation rather than a side-channel atomic, so the count
    /// it returns is never stale relative to an in-flight register/disconnect.
    pub async fn channel_count(&self) -> usize {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self.tx.send(HubEvent::CountChannels(reply_tx)).is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }
}

/// Spawns the hub's single-writer event loop and returns a handle to it.
pub fn spawn() -> HubHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<HubEvent>();
    let handle = HubHandle { tx };
    let loop_handle = handle.clone();

    tokio::spawn(async move {
        let mut channels: HashMap<Uuid, Channel> = HashMap::new();
        info!("hub event loop started");
        while let Some(event) = rx.recv().await {
            match event {
                HubEvent::Create(id, kind) => {
                    info!(%id, ?kind, "channel created");
                    channels.insert(id, Channel::new(id, kind));
                }
                HubEvent::Register(client) => {
                    register(&mut channels, client, &loop_handle);
                }
                HubEvent::Disconnected(client) => {
                    disconnect(&mut channels, &client);
                }
                HubEvent::CountChannels(reply) => {
                    let _ = reply.send(channels.len());
                }
            }
        }
    });

    handle
}

fn register(channels: &mut HashMap<Uuid, Channel>, client: Arc<ClientEndpoint>, hub: &HubHandle) {
    let Some(channel) = channels.get_mut(&client.channel_id) else {
        warn!(channel_id = %client.channel_id, role = %client.role, "registration for unknown channel");
        tokio::spawn(async move {
            sleep(TAR_TRAP_DELAY).await;
            client.close().await;
        });
        return;
    };

    let slot = match client.role {
        Role::Proxy => &mut channel.proxy,
        Role::Tunnel => &mut channel.tunnel,
    };

    // A second registration against an already-filled role overwrites the
    // previous occupant rather than being rejected: the old occupant is
    // explicitly disconnected so it doesn't leak.
    if let Some(previous) = slot.replace(client.clone()) {
        warn!(channel_id = %client.channel_id, role = %client.role, "role re-registered, evicting previous occupant");
        previous.set_peer(None);
        let hub = hub.clone();
        tokio::spawn(async move {
            previous.close().await;
            hub.disconnected(previous);
        });
    }

    if channel.is_attached() {
        let proxy = channel.proxy.clone().expect("just checked is_attached");
        let tunnel = channel.tunnel.clone().expect("just checked is_attached");
        proxy.set_peer(Some(tunnel.clone()));
        tunnel.set_peer(Some(proxy.clone()));

        let kind = channel.kind;
        let channel_id = channel.id;
        let hub = hub.clone();
        tokio::spawn(async move {
            info!(%channel_id, ?kind, "both sides attached");
            handlers::run(kind, channel_id, proxy, tunnel, hub).await;
        });
    }
}

fn disconnect(channels: &mut HashMap<Uuid, Channel>, client: &Arc<ClientEndpoint>) {
    // Idempotent: a channel already torn down by an earlier disconnected
    // event is simply gone from the table, and later events for either of
    // its former occupants are no-ops.
    let Some(channel) = channels.get(&client.channel_id) else {
        return;
    };

    // A disconnected event can arrive for a client that a role re-registration
    // already evicted from its slot (hub.rs `register`'s eviction path sends
    // one once it has closed the old occupant). By then the slot holds a
    // different, live client — checking identity here keeps that stale event
    // from tearing down the channel the new occupant just attached to.
    let slot = match client.role {
        Role::Proxy => &channel.proxy,
        Role::Tunnel => &channel.tunnel,
    };
    match slot {
        Some(current) if Arc::ptr_eq(current, client) => {}
        _ => return,
    }

    let channel = channels.remove(&client.channel_id).expect("just looked up");

    info!(channel_id = %client.channel_id, "channel destroyed");

    if let Some(proxy) = &channel.proxy {
        proxy.set_peer(None);
    }
    if let Some(tunnel) = &channel.tunnel {
        tunnel.set_peer(None);
    }

    tokio::spawn(async move {
        if let Some(proxy) = channel.proxy {
            proxy.close().await;
        }
        if let Some(tunnel) = channel.tunnel {
            tunnel.close().await;
        }
    });
}
