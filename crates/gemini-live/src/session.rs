//! The transport seam between a Live API caller and the wire.

use crate::{
    error::LiveError,
    types::{FunctionResponse, ResponseModality, ServerMessage, Tool},
};
use async_trait::async_trait;
use secrecy::SecretString;

/// Everything the server needs to know when a session is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Model name, with or without the `models/` prefix.
    pub model: String,
    pub tools: Vec<Tool>,
    pub response_modality: ResponseModality,
}

/// An open, single-use Live session.
///
/// A session is driven by one task: send a turn, then pull messages until
/// [`LiveSession::next_message`] yields `Ok(None)`. Callers must call
/// [`LiveSession::close`] on every exit path.
#[async_trait]
pub trait LiveSession: Send {
    /// Sends `text` as one complete user turn.
    async fn send_turn(&mut self, text: &str) -> Result<(), LiveError>;

    /// Answers a single function call issued by the model.
    async fn send_tool_response(&mut self, response: FunctionResponse) -> Result<(), LiveError>;

    /// Waits for the next server message. `Ok(None)` means the stream is over.
    async fn next_message(&mut self) -> Result<Option<ServerMessage>, LiveError>;

    /// Closes the underlying connection. Calling it twice is harmless.
    async fn close(&mut self) -> Result<(), LiveError>;
}

/// Opens Live sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects, performs the setup handshake and returns a ready session.
    async fn connect(
        &self,
        api_key: &SecretString,
        config: SessionConfig,
    ) -> Result<Box<dyn LiveSession>, LiveError>;
}
