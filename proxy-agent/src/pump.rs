use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wws_wire::{CONTROL_CLOSE, PROXY_CHUNK_SIZE};

use crate::cli::Config;
use crate::error::AgentError;

/// Drains the outbound message queue onto the WebSocket. Having a single
/// task own the sink means the inbound-dispatch loop and the TCP→WS pump
/// can both hand it frames without fighting over the same `SplitSink`,
/// the same shape `manhpham90vn-tunnel`'s server uses for its outbound
/// draining task.
async fn writer_task<S>(
    mut ws_write: SplitSink<WebSocketStream<S>, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        if ws_write.send(msg).await.is_err() {
            break;
        }
    }
}

/// Reads the remote TCP connection and forwards each chunk (up to
/// `PROXY_CHUNK_SIZE`) as a binary frame, until EOF or error.
async fn tcp_to_ws(mut tcp_read: OwnedReadHalf, to_ws: mpsc::UnboundedSender<Message>) {
    let mut buf = vec![0u8; PROXY_CHUNK_SIZE];
    loop {
        match tcp_read.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if to_ws
                    .send(Message::Binary(buf[..n].to_vec().into()))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "remote read error");
                break;
            }
        }
    }
}

/// Dispatches inbound WebSocket frames: the first binary frame triggers a
/// lazy dial to `config.remote`, after which a `tcp_to_ws` task forwards
/// the response traffic back. A `"close"` control frame tears the remote
/// connection down and ends the session.
pub async fn run<S>(
    config: &Config,
    ws_write: SplitSink<WebSocketStream<S>, Message>,
    mut ws_read: SplitStream<WebSocketStream<S>>,
    shutdown: CancellationToken,
) -> Result<(), AgentError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (to_ws_tx, to_ws_rx) = mpsc::unbounded_channel::<Message>();
    tokio::spawn(writer_task(ws_write, to_ws_rx));

    let mut tcp_write: Option<OwnedWriteHalf> = None;
    let mut tcp_task: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            frame = ws_read.next() => {
                match frame {
                    Some(Ok(Message::Binary(data))) => {
                        if tcp_write.is_none() {
                            info!(remote = %config.remote, "dialing remote on first inbound frame");
                            let stream = TcpStream::connect(&config.remote).await?;
                            let (read_half, write_half) = stream.into_split();
                            tcp_write = Some(write_half);
                            tcp_task = Some(tokio::spawn(tcp_to_ws(read_half, to_ws_tx.clone())));
                        }
                        tcp_write.as_mut().unwrap().write_all(&data).await?;
                    }
                    Some(Ok(Message::Text(t))) if t == CONTROL_CLOSE => {
                        info!("peer requested close");
                        if let Some(handle) = tcp_task.take() {
                            handle.abort();
                        }
                        return Ok(());
                    }
                    Some(Ok(Message::Text(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            _ = shutdown.cancelled() => {
                info!("sending close frame");
                let _ = to_ws_tx.send(Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "".into(),
                })));
                return Ok(());
            }
        }
    }
}
