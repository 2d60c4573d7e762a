//! # wws-connector
//!
//! The rendezvous hub of the wws tunnel relay. A Proxy agent and a Tunnel
//! agent each register against the same channel id; once both are present
//! the Connector attaches them and relays bytes between their WebSockets
//! until either side disconnects.
//!
//! ## Modules
//!
//! - [`config`]       — CLI/env configuration
//! - [`channel`]       — per-channel state (`Channel`)
//! - [`client`]        — one registered WebSocket endpoint (`ClientEndpoint`)
//! - [`hub`]           — the single-writer channel table and its event loop
//! - [`handlers`]      — per-channel-kind relay implementations
//! - [`frame_stream`]  — byte-stream facade over a `ClientEndpoint`
//! - [`http`]          — the axum router
//! - [`error`]         — leaf error type

use clap::Parser;
use tracing::info;

use wws_connector::config::Config;
use wws_connector::{http, hub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wws_connector=info".into()),
        )
        .init();

    let config = Config::parse();
    let hub = hub::spawn();
    let app = http::router(hub, &config.public_dir);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!(listen = %config.listen, public_dir = %config.public_dir.display(), "wws-connector listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
