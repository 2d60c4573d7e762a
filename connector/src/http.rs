use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path as AxPath, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use wws_wire::{ChannelKind, Role, PING_PERIOD, WRITE_WAIT};

use crate::client::ClientEndpoint;
use crate::hub::HubHandle;

/// Builds the Connector's router: channel creation, the two WebSocket
/// upgrade endpoints, a liveness probe, and a static fallback serving
/// `public_dir` for anything else — mirroring the teacher's `NotFound =
/// http.FileServer(...)` behavior via `fallback_service`.
pub fn router(hub: HubHandle, public_dir: &Path) -> Router {
    Router::new()
        .route("/create", get(create_channel))
        .route("/ws/proxy/{id}", get(ws_proxy))
        .route("/ws/tunnel/{id}", get(ws_tunnel))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(hub)
        .fallback_service(ServeDir::new(public_dir))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    active_channels: usize,
}

async fn healthz(State(hub): State<HubHandle>) -> impl IntoResponse {
    Json(Health {
        status: "ok",
        active_channels: hub.channel_count().await,
    })
}

async fn create_channel(
    State(hub): State<HubHandle>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let kind = ChannelKind::parse(params.get("type").map(String::as_str));
    let id = Uuid::new_v4();
    info!(%id, ?kind, "creating channel");
    hub.create(id, kind);
    id.to_string()
}

async fn ws_proxy(
    ws: WebSocketUpgrade,
    AxPath(id): AxPath<Uuid>,
    Query(params): Query<HashMap<String, String>>,
    State(hub): State<HubHandle>,
) -> Response {
    upgrade(ws, id, Role::Proxy, params, hub)
}

async fn ws_tunnel(
    ws: WebSocketUpgrade,
    AxPath(id): AxPath<Uuid>,
    Query(params): Query<HashMap<String, String>>,
    State(hub): State<HubHandle>,
) -> Response {
    upgrade(ws, id, Role::Tunnel, params, hub)
}

fn upgrade(
    ws: WebSocketUpgrade,
    id: Uuid,
    role: Role,
    params: HashMap<String, String>,
    hub: HubHandle,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let client = ClientEndpoint::new(socket, id, role, params);
        info!(channel_id = %id, %role, "client registered");
        hub.register(client.clone());
        keepalive(client, hub).await;
    })
}

/// Runs for the lifetime of one WebSocket connection: pings on a fixed
/// period and reports the client as disconnected the moment a ping fails or
/// times out. This is what actually notices a half-attached peer (one with
/// no relay pump yet to notice for it) going away.
async fn keepalive(client: Arc<ClientEndpoint>, hub: HubHandle) {
    let mut ticker = tokio::time::interval(PING_PERIOD);
    loop {
        ticker.tick().await;
        match tokio::time::timeout(WRITE_WAIT, client.write_ping()).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => warn!(channel_id = %client.channel_id, error = %e, "ping failed"),
            Err(_) => warn!(channel_id = %client.channel_id, "ping timed out"),
        }
        hub.disconnected(client);
        return;
    }
}
