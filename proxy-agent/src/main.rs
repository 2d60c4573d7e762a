//! # wws-proxy
//!
//! Server-side agent: dials a Connector channel and, on the first inbound
//! binary frame, dials the real remote TCP service and relays bytes
//! between the two.

mod cli;
mod error;
mod pump;

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cli::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wws_proxy_agent=info".into()),
        )
        .init();

    let config = Config::parse();
    let url = config.ws_url();
    info!(%url, remote = %config.remote, "connecting to connector");

    let (ws, _) = match tokio_tungstenite::connect_async(&url).await {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "failed to connect to connector");
            std::process::exit(1);
        }
    };

    let (ws_write, ws_read) = futures_util::StreamExt::split(ws);
    let shutdown = CancellationToken::new();

    let run = pump::run(&config, ws_write, ws_read, shutdown.clone());
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => {
            if let Err(e) = result {
                error!(error = %e, "proxy session ended");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, sending close frame");
            shutdown.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(1), &mut run).await;
        }
    }

    Ok(())
}
