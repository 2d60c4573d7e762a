use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use uuid::Uuid;
use wws_wire::Role;

use crate::error::ConnectorError;

/// A data frame as seen by the relay, stripped of its WebSocket envelope.
/// Control frames (ping/pong/close) never surface past [`ClientEndpoint::read_frame`].
#[derive(Debug, Clone)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
}

/// One end of an attached (or not-yet-attached) channel.
///
/// The read half and write half are guarded by independent locks so the
/// keepalive ticker can write a ping concurrently with a relay pump reading
/// the next frame, matching the two-mutex split the Go original used around
/// its single `*websocket.Conn`. `peer` is the one field the hub itself
/// mutates; every other field is set once at construction.
pub struct ClientEndpoint {
    pub channel_id: Uuid,
    pub role: Role,
    pub params: HashMap<String, String>,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    peer: ArcSwapOption<ClientEndpoint>,
}

impl ClientEndpoint {
    pub fn new(
        ws: WebSocket,
        channel_id: Uuid,
        role: Role,
        params: HashMap<String, String>,
    ) -> Arc<Self> {
        let (sink, stream) = ws.split();
        Arc::new(Self {
            channel_id,
            role,
            params,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            peer: ArcSwapOption::const_empty(),
        })
    }

    pub fn peer(&self) -> Option<Arc<ClientEndpoint>> {
        self.peer.load_full()
    }

    /// Only the hub calls this — it is the sole mutator of the peer
    /// back-reference, which is what lets the proxy/tunnel reference cycle
    /// get torn down cleanly on disconnect.
    pub fn set_peer(&self, peer: Option<Arc<ClientEndpoint>>) {
        self.peer.store(peer);
    }

    pub async fn write_frame(&self, frame: Frame) -> Result<(), ConnectorError> {
        let msg = match frame {
            Frame::Binary(b) => Message::Binary(b.into()),
            Frame::Text(t) => Message::Text(t.into()),
        };
        let mut sink = self.sink.lock().await;
        sink.send(msg).await.map_err(ConnectorError::from)
    }

    pub async fn write_ping(&self) -> Result<(), ConnectorError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Ping(Vec::new().into()))
            .await
            .map_err(ConnectorError::from)
    }

    /// Reads the next data frame, silently absorbing ping/pong frames —
    /// pong handling itself is delegated to the WebSocket library. Returns
    /// `Ok(None)` once the peer has sent a close frame or the stream ends.
    pub async fn read_frame(&self) -> Result<Option<Frame>, ConnectorError> {
        let mut stream = self.stream.lock().await;
        loop {
            return match stream.next().await {
                None => Ok(None),
                Some(Err(e)) => Err(e.into()),
                Some(Ok(Message::Binary(b))) => Ok(Some(Frame::Binary(b.to_vec()))),
                Some(Ok(Message::Text(t))) => Ok(Some(Frame::Text(t.to_string()))),
                Some(Ok(Message::Close(_))) => Ok(None),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            };
        }
    }

    pub async fn close(&self) {
        let mut sink = self.sink.lock().await;
        let _ = sink.close().await;
    }
}
