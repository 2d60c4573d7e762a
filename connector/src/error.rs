use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel {0} not found")]
    ChannelNotFound(Uuid),

    #[error("connection closed")]
    Closed,
}
