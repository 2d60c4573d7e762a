#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("both --listen and --proxy were given; they are mutually exclusive")]
    ConflictingLocalMode,
}
