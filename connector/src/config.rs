use std::path::PathBuf;

use clap::Parser;

/// wws-connector: WebSocket rendezvous hub pairing Proxy and Tunnel agents
/// onto a channel and relaying bytes between them.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Address to listen on for HTTP and WebSocket traffic.
    #[arg(long, env = "WWS_CONNECTOR_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Directory served as a static fallback for any request that isn't
    /// `/create` or a `/ws/*` upgrade.
    #[arg(long, env = "WWS_CONNECTOR_PUBLIC_DIR", default_value = "./public")]
    pub public_dir: PathBuf,
}
