use std::sync::Arc;

use russh::client::{self, Handle};
use russh::{ChannelMsg, Pty};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{error, warn};
use uuid::Uuid;

use crate::client::ClientEndpoint;
use crate::frame_stream::FrameStream;
use crate::hub::HubHandle;

const DEFAULT_COLS: u32 = 80;
const DEFAULT_ROWS: u32 = 24;

/// Runs an embedded SSH client over the Proxy leg, with the Tunnel leg
/// playing the role of the SSH client's own terminal: it supplies the
/// username/geometry as query parameters and carries the interactive shell
/// session as raw bytes. Neither leg sees SSH framing — from outside this
/// handler, both endpoints just look like an attached channel like any
/// other; the protocol only exists between the two `FrameStream`s this
/// function builds over them.
pub async fn run(
    channel_id: Uuid,
    proxy: Arc<ClientEndpoint>,
    tunnel: Arc<ClientEndpoint>,
    hub: HubHandle,
) {
    if let Err(e) = run_inner(channel_id, proxy.clone(), tunnel.clone()).await {
        error!(%channel_id, error = %e, "ssh handler failed");
    }

    proxy.close().await;
    tunnel.close().await;
    hub.disconnected(proxy);
    hub.disconnected(tunnel);
}

async fn run_inner(
    channel_id: Uuid,
    proxy: Arc<ClientEndpoint>,
    tunnel: Arc<ClientEndpoint>,
) -> anyhow::Result<()> {
    let username = tunnel
        .params
        .get("username")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing required `username` query parameter"))?;
    let cols: u32 = tunnel
        .params
        .get("cols")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COLS);
    let rows: u32 = tunnel
        .params
        .get("rows")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_ROWS);
    let password = tunnel.params.get("password").cloned();

    let proxy_stream = FrameStream::new(proxy.clone());
    let mut tunnel_stream = FrameStream::new(tunnel.clone());

    let config = Arc::new(client_config());
    let mut session: Handle<SshClientHandler> =
        client::connect_stream(config, proxy_stream, SshClientHandler).await?;

    let password = match password {
        Some(p) => p,
        None => prompt_password(&mut tunnel_stream, &username).await?,
    };

    let authenticated = session.authenticate_password(&username, &password).await?;
    anyhow::ensure!(
        authenticated,
        "ssh authentication rejected for user {username}"
    );

    let mut channel = session.channel_open_session().await?;
    channel
        .request_pty(
            false,
            "xterm",
            cols,
            rows,
            0,
            0,
            &[
                (Pty::ECHO, 1),
                (Pty::TTY_OP_ISPEED, 14400),
                (Pty::TTY_OP_OSPEED, 14400),
            ],
        )
        .await?;
    channel.request_shell(false).await?;

    pump_session(channel_id, channel, tunnel_stream).await
}

/// Matches the Go original's `PasswordCallback`, templated with the
/// username: prompt over the tunnel leg, read one line, echo a newline
/// back. Used only when the Tunnel agent didn't already supply `password`
/// as a query parameter.
async fn prompt_password(
    tunnel_stream: &mut FrameStream,
    username: &str,
) -> anyhow::Result<String> {
    let prompt = format!("{username} password: ");
    tunnel_stream.write_all(prompt.as_bytes()).await?;
    tunnel_stream.flush().await?;

    let mut reader = BufReader::new(&mut *tunnel_stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    tunnel_stream.write_all(b"\r\n").await?;
    Ok(line.trim().to_string())
}

async fn pump_session(
    channel_id: Uuid,
    mut channel: russh::Channel<client::Msg>,
    tunnel_stream: FrameStream,
) -> anyhow::Result<()> {
    let (mut read_half, mut write_half) = tokio::io::split(tunnel_stream);
    let mut buf = vec![0u8; 32 * 1024];

    loop {
        tokio::select! {
            result = read_half.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        let _ = channel.eof().await;
                        break;
                    }
                    Ok(n) => {
                        channel.data(&buf[..n]).await?;
                    }
                    Err(e) => {
                        warn!(%channel_id, error = %e, "tunnel leg read error");
                        break;
                    }
                }
            }
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                        write_half.write_all(&data).await?;
                    }
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => break,
                    Some(ChannelMsg::ExitStatus { .. }) => break,
                    Some(_) => {}
                }
            }
        }
    }

    Ok(())
}

/// Extends the library's default cipher preference with `aes128-cbc`,
/// mirroring `GetSupportedCiphers` in the Go original: some legacy SSH
/// servers this relay targets only speak that cipher.
fn client_config() -> client::Config {
    let mut cipher = russh::Preferred::DEFAULT.cipher.to_vec();
    let aes128_cbc = russh::cipher::Name("aes128-cbc");
    if !cipher.contains(&aes128_cbc) {
        cipher.push(aes128_cbc);
    }

    client::Config {
        preferred: russh::Preferred {
            cipher: cipher.into(),
            ..russh::Preferred::DEFAULT
        },
        ..client::Config::default()
    }
}

struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;
    type FutureUnit = futures_util::future::Ready<Result<(Self, client::Session), Self::Error>>;
    type FutureBool = futures_util::future::Ready<Result<(Self, bool), Self::Error>>;

    fn finished_bool(self, b: bool) -> Self::FutureBool {
        futures_util::future::ready(Ok((self, b)))
    }

    fn finished(self, session: client::Session) -> Self::FutureUnit {
        futures_util::future::ready(Ok((self, session)))
    }

    /// The transport here is the Connector's own Proxy-leg WebSocket, not a
    /// direct TCP connection to the target host, so there's no independently
    /// verifiable host key to pin against.
    fn check_server_key(self, _server_public_key: &russh_keys::key::PublicKey) -> Self::FutureBool {
        self.finished_bool(true)
    }
}
