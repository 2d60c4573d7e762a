use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::client::ClientEndpoint;
use crate::hub::HubHandle;

/// Symmetric bidirectional relay: each side gets its own pump reading
/// frames off its own WebSocket and writing them to its peer. The two pumps
/// are independent — one side going away tears down only that side's pump,
/// and the pump's own cleanup takes care of closing the peer too.
pub async fn run(
    channel_id: Uuid,
    proxy: Arc<ClientEndpoint>,
    tunnel: Arc<ClientEndpoint>,
    hub: HubHandle,
) {
    tokio::join!(
        pump(channel_id, proxy, hub.clone()),
        pump(channel_id, tunnel, hub),
    );
}

/// Mirrors the Go original's `defer`/`recover` around each passthrough
/// goroutine: whatever ends the read loop — a clean close, a read error, or
/// a panic unwinding through this future — the guard fires exactly one
/// `disconnected` event for `client`.
struct DisconnectGuard {
    client: Arc<ClientEndpoint>,
    hub: HubHandle,
    fired: bool,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.fired {
            self.hub.disconnected(self.client.clone());
        }
    }
}

async fn pump(channel_id: Uuid, client: Arc<ClientEndpoint>, hub: HubHandle) {
    let mut guard = DisconnectGuard {
        client: client.clone(),
        hub: hub.clone(),
        fired: false,
    };

    loop {
        match client.read_frame().await {
            Ok(Some(frame)) => {
                if let Some(peer) = client.peer() {
                    if let Err(e) = peer.write_frame(frame).await {
                        warn!(%channel_id, role = %client.role, error = %e, "relay write to peer failed");
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(%channel_id, role = %client.role, error = %e, "relay read failed");
                break;
            }
        }
    }

    if let Some(peer) = client.peer() {
        peer.close().await;
    }
    client.close().await;

    guard.fired = true;
    hub.disconnected(client);
}
