use clap::Parser;
use uuid::Uuid;

/// wws-proxy: dials a Connector channel and relays it to a remote TCP
/// service, dialing the remote lazily on the first inbound byte.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Connector base URL, e.g. ws://localhost:8080
    #[arg(long, env = "WWS_CONNECTOR")]
    pub connector: String,

    /// Channel id returned by `GET /create` on the Connector.
    #[arg(long, env = "WWS_CHANNEL")]
    pub channel: Uuid,

    /// Remote host:port this proxy forwards to once the channel has data.
    #[arg(long, env = "WWS_REMOTE", default_value = "localhost:22")]
    pub remote: String,
}

impl Config {
    pub fn ws_url(&self) -> String {
        format!(
            "{}/ws/proxy/{}",
            self.connector.trim_end_matches('/'),
            self.channel
        )
    }
}
