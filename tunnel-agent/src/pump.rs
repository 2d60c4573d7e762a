use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wws_wire::{CONTROL_CLOSE, CONTROL_GOT_BOTH, TUNNEL_CHUNK_SIZE};

use crate::error::AgentError;

/// Blocks until a `WWS_GOTBOTH` text frame arrives, discarding anything
/// else in between. Only used when `--wait` is passed; this repo's own
/// Connector never sends the frame, so this is purely a compatibility path
/// for a Connector that does.
pub async fn wait_for_both<S>(ws: &mut WebSocketStream<S>) -> Result<(), AgentError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("--wait: blocking for WWS_GOTBOTH");
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(t))) if t == CONTROL_GOT_BOTH => {
                info!("WWS_GOTBOTH received, starting pumps");
                return Ok(());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(AgentError::Io(std::io::Error::other(
                    "ws closed before WWS_GOTBOTH",
                )))
            }
        }
    }
}

/// local → WebSocket: each read of up to `TUNNEL_CHUNK_SIZE` becomes one
/// binary frame. A local EOF sends a `"close"` control frame and returns.
/// Cancelling `shutdown` sends a normal-closure WebSocket close frame
/// instead, mirroring the Go original's `SIGINT` handling.
pub async fn pump_to_ws<L, S>(
    mut local_read: ReadHalf<L>,
    mut ws_write: SplitSink<WebSocketStream<S>, Message>,
    shutdown: CancellationToken,
) -> Result<(), AgentError>
where
    L: AsyncRead,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; TUNNEL_CHUNK_SIZE];
    loop {
        tokio::select! {
            result = local_read.read(&mut buf) => {
                let n = result?;
                if n == 0 {
                    let _ = ws_write.send(Message::Text(CONTROL_CLOSE.into())).await;
                    return Ok(());
                }
                ws_write
                    .send(Message::Binary(buf[..n].to_vec().into()))
                    .await?;
            }
            _ = shutdown.cancelled() => {
                info!("sending close frame");
                let _ = ws_write
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    })))
                    .await;
                return Ok(());
            }
        }
    }
}

/// WebSocket → local: each received binary frame is written straight
/// through. A `"close"` text control frame or a WebSocket close ends the
/// session.
pub async fn pump_from_ws<L, S>(
    mut local_write: WriteHalf<L>,
    mut ws_read: SplitStream<WebSocketStream<S>>,
) -> Result<(), AgentError>
where
    L: AsyncWrite,
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match ws_read.next().await {
            Some(Ok(Message::Binary(data))) => {
                local_write.write_all(&data).await?;
            }
            Some(Ok(Message::Text(t))) if t == CONTROL_CLOSE => {
                info!("peer requested close");
                return Ok(());
            }
            Some(Ok(Message::Close(_))) | None => return Ok(()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(error = %e, "websocket read error");
                return Err(e.into());
            }
        }
    }
}
