//! Wire-level constants and small shared types for the proxy/tunnel/connector
//! trio. Kept deliberately tiny: the relay payload itself is opaque bytes,
//! not a structured protocol, so there is no message enum to share here —
//! only the handful of timing constants and control literals that all three
//! binaries must agree on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time allowed to write a message to a peer before the write is considered
/// failed.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Interval at which the Connector pings each registered client.
/// Must stay below `WRITE_WAIT` so a stalled pong is caught before the next
/// ping deadline expires.
pub const PING_PERIOD: Duration = Duration::from_millis(WRITE_WAIT.as_millis() as u64 * 5 / 10);

/// How long an unmatched registration (unknown channel id) is kept open
/// before the Connector closes it. Named for what it does to scanners
/// probing for valid channel ids.
pub const TAR_TRAP_DELAY: Duration = Duration::from_secs(30);

/// Chunk size used by the Tunnel agent when reading from its local side.
pub const TUNNEL_CHUNK_SIZE: usize = 64 * 1024;

/// Chunk size used by the Proxy agent when reading from the remote TCP
/// service.
pub const PROXY_CHUNK_SIZE: usize = 1024 * 1024;

/// Text-frame control payload meaning "the sender is tearing down this
/// session; stop relaying".
pub const CONTROL_CLOSE: &str = "close";

/// Text-frame control payload sent by a Connector variant that announces
/// dual-attachment to the tunnel side before data starts flowing. The
/// Connector in this repo does not emit it, but `--wait` on the Tunnel
/// agent still recognizes it for compatibility.
pub const CONTROL_GOT_BOTH: &str = "WWS_GOTBOTH";

/// Which side of a channel a client endpoint occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Runs on the network containing the target TCP service.
    Proxy,
    /// Runs on the client side, exposing the relayed service locally.
    Tunnel,
}

impl Role {
    pub fn as_path_segment(self) -> &'static str {
        match self {
            Role::Proxy => "proxy",
            Role::Tunnel => "tunnel",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_path_segment())
    }
}

/// Selects which per-channel handler the Connector invokes once both sides
/// are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChannelKind {
    #[default]
    Tunnel,
    Ssh,
}

impl ChannelKind {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("ssh") => ChannelKind::Ssh,
            _ => ChannelKind::Tunnel,
        }
    }
}
