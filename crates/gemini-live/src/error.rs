use tokio_tungstenite::tungstenite;

/// Failures talking to the Live API.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("Failed to encode or decode a Live API message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid Live API request: {0}")]
    InvalidRequest(String),
    #[error("Setup was not acknowledged by the server; received: {0}")]
    SetupRejected(String),
    #[error("Connection closed before setup completed")]
    ClosedDuringSetup,
    #[error("Connection closed by server with code {code}: {reason}")]
    ClosedByServer { code: u16, reason: String },
}
