//! Client for the Gemini Live (`BidiGenerateContent`) WebSocket API.
//!
//! - `types`: the JSON messages exchanged with the service.
//! - `session`: the `Connector` / `LiveSession` traits callers program against.
//! - `ws`: the real WebSocket implementation of those traits.

pub mod error;
pub mod session;
pub mod types;
pub mod ws;

pub use error::LiveError;
pub use session::{Connector, LiveSession, SessionConfig};
pub use types::{
    FunctionCall, FunctionResponse, Part, ResponseModality, ServerContent, ServerMessage, Tool,
    ToolCall, ToolOptions,
};
pub use ws::{WsConnector, WsSession};
