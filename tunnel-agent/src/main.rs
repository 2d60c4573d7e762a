//! # wws-tunnel
//!
//! Client-side agent: dials a Connector channel and exposes its relayed
//! byte stream locally, either as a TCP listener, an outbound
//! connect-on-write TCP connection, or stdio.

mod cli;
mod error;
mod local_stream;
mod pump;

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cli::Config;
use local_stream::LocalStream;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wws_tunnel_agent=info".into()),
        )
        .init();

    let config = Config::parse();
    let url = config.ws_url();
    info!(%url, "connecting to connector");

    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await?;

    if config.wait {
        pump::wait_for_both(&mut ws).await?;
    }

    let local = match LocalStream::from_config(&config).await {
        Ok(local) => local,
        Err(e) => {
            error!(error = %e, "failed to set up local side");
            std::process::exit(1);
        }
    };

    let (local_read, local_write) = tokio::io::split(local);
    let (ws_write, ws_read) = futures_util::StreamExt::split(ws);

    let shutdown = CancellationToken::new();
    let to_ws = pump::pump_to_ws(local_read, ws_write, shutdown.clone());
    let from_ws = pump::pump_from_ws(local_write, ws_read);
    tokio::pin!(to_ws, from_ws);

    tokio::select! {
        result = &mut to_ws => {
            if let Err(e) = result {
                error!(error = %e, "local -> websocket pump ended");
            }
        }
        result = &mut from_ws => {
            if let Err(e) = result {
                error!(error = %e, "websocket -> local pump ended");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, sending close frame");
            shutdown.cancel();
            // Give the Connector up to a second to close its end in response
            // before this process exits, mirroring the Go original's SIGINT
            // handling.
            let _ = tokio::time::timeout(Duration::from_secs(1), &mut from_ws).await;
        }
    }

    Ok(())
}
