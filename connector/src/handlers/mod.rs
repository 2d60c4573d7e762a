pub mod passthrough;
pub mod ssh;

use std::sync::Arc;

use uuid::Uuid;
use wws_wire::ChannelKind;

use crate::client::ClientEndpoint;
use crate::hub::HubHandle;

/// Dispatches a freshly-attached channel to the handler its kind selects.
/// Whichever handler runs owns both endpoints for the lifetime of the
/// channel and is responsible for reporting exactly one disconnection per
/// side back to the hub once it's done.
pub async fn run(
    kind: ChannelKind,
    channel_id: Uuid,
    proxy: Arc<ClientEndpoint>,
    tunnel: Arc<ClientEndpoint>,
    hub: HubHandle,
) {
    match kind {
        ChannelKind::Tunnel => passthrough::run(channel_id, proxy, tunnel, hub).await,
        ChannelKind::Ssh => ssh::run(channel_id, proxy, tunnel, hub).await,
    }
}
