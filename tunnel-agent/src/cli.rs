use clap::Parser;
use uuid::Uuid;

/// wws-tunnel: dials a Connector channel and exposes its relayed byte
/// stream locally as a TCP listener, an outbound connect-on-write TCP
/// connection, or stdio.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Connector base URL, e.g. ws://localhost:8080
    #[arg(long, env = "WWS_CONNECTOR")]
    pub connector: String,

    /// Channel id returned by `GET /create` on the Connector.
    #[arg(long, env = "WWS_CHANNEL")]
    pub channel: Uuid,

    /// Listen on this local host:port and relay the first accepted TCP
    /// connection. Mutually exclusive with `--proxy`; if neither is given,
    /// stdio is used.
    #[arg(long, env = "WWS_TCP_LISTEN")]
    pub listen: Option<String>,

    /// Connect out to this host:port on first outbound byte instead of
    /// listening. Mutually exclusive with `--listen`.
    #[arg(long, env = "PROXY")]
    pub proxy: Option<String>,

    /// Wait for a `WWS_GOTBOTH` control frame before starting the relay
    /// pumps. Retained for compatibility with a Connector that emits it;
    /// this repo's Connector never does.
    #[arg(long)]
    pub wait: bool,
}

impl Config {
    pub fn ws_url(&self) -> String {
        format!(
            "{}/ws/tunnel/{}",
            self.connector.trim_end_matches('/'),
            self.channel
        )
    }
}
