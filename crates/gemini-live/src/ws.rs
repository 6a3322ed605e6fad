//! WebSocket implementation of the Live transport.

use crate::{
    error::LiveError,
    session::{Connector, LiveSession, SessionConfig},
    types::{
        BidiGenerateContentClientContent, BidiGenerateContentSetup,
        BidiGenerateContentToolResponse, ClientMessage, Content, FunctionResponse,
        GenerationConfig, ServerMessage,
    },
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Error as WsError,
        protocol::{Message as WsMessage, frame::coding::CloseCode},
    },
};
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1alpha";

/// Opens Live sessions over a real WebSocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
    api_version: String,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl WsConnector {
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Selects the API version segment of the service path (e.g. `v1beta`).
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Points the connector at a different host, e.g. a local proxy.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Builds the service URL. The key is part of the query string, so the
    /// result must never be logged.
    fn url(&self, api_key: &SecretString) -> Result<String, LiveError> {
        if !(self.endpoint.starts_with("wss://") || self.endpoint.starts_with("ws://")) {
            return Err(LiveError::InvalidRequest(format!(
                "endpoint '{}' is not a WebSocket URL",
                self.endpoint
            )));
        }
        if self.api_version.is_empty() || self.api_version.contains('/') {
            return Err(LiveError::InvalidRequest(format!(
                "'{}' is not a valid API version",
                self.api_version
            )));
        }
        Ok(format!(
            "{}/ws/google.ai.generativelanguage.{}.GenerativeService.BidiGenerateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.api_version,
            api_key.expose_secret()
        ))
    }
}

/// Prefixes bare model names with `models/` as the setup message requires.
pub fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        api_key: &SecretString,
        config: SessionConfig,
    ) -> Result<Box<dyn LiveSession>, LiveError> {
        let url = self.url(api_key)?;
        let (ws_stream, _) = connect_async(url).await?;
        info!(api_version = %self.api_version, "Connected to Gemini Live WebSocket.");

        let mut session = WsSession {
            stream: ws_stream,
            turn_finished: false,
            closed: false,
        };
        if let Err(e) = session.setup(config).await {
            if let Err(close_err) = session.close().await {
                warn!(error = %close_err, "Failed to close Live session after setup failure.");
            }
            return Err(e);
        }
        Ok(Box::new(session))
    }
}

/// A Live session backed by a WebSocket.
///
/// The stream ends after the message that completes the model's turn, or
/// when the server closes the socket. Dropping the session drops the socket.
pub struct WsSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    turn_finished: bool,
    closed: bool,
}

impl WsSession {
    async fn setup(&mut self, config: SessionConfig) -> Result<(), LiveError> {
        let setup = ClientMessage::Setup(BidiGenerateContentSetup {
            model: qualified_model(&config.model),
            generation_config: GenerationConfig {
                response_modalities: vec![config.response_modality],
            },
            tools: config.tools,
        });
        self.send(&setup).await?;

        match self.read_frame().await? {
            Some(msg) if msg.setup_complete.is_some() => {
                info!("Gemini Live session setup is complete.");
                Ok(())
            }
            Some(msg) => Err(LiveError::SetupRejected(format!("{msg:?}"))),
            None => Err(LiveError::ClosedDuringSetup),
        }
    }

    async fn send(&mut self, msg: &ClientMessage) -> Result<(), LiveError> {
        let payload = serde_json::to_string(msg)?;
        self.stream.send(WsMessage::Text(payload.into())).await?;
        Ok(())
    }

    /// Reads frames until one decodes into a [`ServerMessage`] or the socket ends.
    async fn read_frame(&mut self) -> Result<Option<ServerMessage>, LiveError> {
        if self.closed {
            return Ok(None);
        }
        while let Some(frame) = self.stream.next().await {
            let decoded = match frame {
                Ok(WsMessage::Text(text)) => serde_json::from_str::<ServerMessage>(&text),
                // The Live API delivers its JSON in binary frames as well.
                Ok(WsMessage::Binary(data)) => serde_json::from_slice::<ServerMessage>(&data),
                Ok(WsMessage::Close(close_frame)) => {
                    self.closed = true;
                    return match close_frame {
                        Some(frame)
                            if !matches!(frame.code, CloseCode::Normal | CloseCode::Away) =>
                        {
                            let code = u16::from(frame.code);
                            warn!(
                                code,
                                reason = %frame.reason,
                                "Gemini Live connection closed with an error."
                            );
                            Err(LiveError::ClosedByServer {
                                code,
                                reason: frame.reason.to_string(),
                            })
                        }
                        close_frame => {
                            info!(?close_frame, "Gemini Live connection closed by server.");
                            Ok(None)
                        }
                    };
                }
                Ok(_) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    self.closed = true;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            match decoded {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => warn!(error = %e, "Skipping undecodable Live API frame."),
            }
        }
        self.closed = true;
        Ok(None)
    }
}

#[async_trait]
impl LiveSession for WsSession {
    async fn send_turn(&mut self, text: &str) -> Result<(), LiveError> {
        let turn = ClientMessage::ClientContent(BidiGenerateContentClientContent {
            turns: vec![Content::user(text)],
            turn_complete: true,
        });
        self.send(&turn).await
    }

    async fn send_tool_response(&mut self, response: FunctionResponse) -> Result<(), LiveError> {
        let msg = ClientMessage::ToolResponse(BidiGenerateContentToolResponse {
            function_responses: vec![response],
        });
        self.send(&msg).await
    }

    async fn next_message(&mut self) -> Result<Option<ServerMessage>, LiveError> {
        if self.turn_finished {
            return Ok(None);
        }
        let msg = self.read_frame().await?;
        if msg.as_ref().is_some_and(ServerMessage::is_turn_complete) {
            debug!("Model turn complete; ending stream.");
            self.turn_finished = true;
        }
        Ok(msg)
    }

    async fn close(&mut self) -> Result<(), LiveError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionCall, Part, Tool, ToolOptions};
    use serde_json::{Value, json};
    use std::future::Future;
    use tokio::{net::TcpListener, task::JoinHandle};
    use tokio_tungstenite::{accept_async, tungstenite::protocol::CloseFrame};

    type ServerSocket = WebSocketStream<TcpStream>;

    fn key() -> SecretString {
        SecretString::from("test-key".to_string())
    }

    #[test]
    fn test_default_url_targets_v1alpha() {
        let url = WsConnector::new().url(&key()).unwrap();
        assert_eq!(
            url,
            "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent?key=test-key"
        );
    }

    #[test]
    fn test_custom_endpoint_and_version() {
        let url = WsConnector::new()
            .with_endpoint("ws://127.0.0.1:9000/")
            .with_api_version("v1beta")
            .url(&key())
            .unwrap();
        assert!(url.starts_with(
            "ws://127.0.0.1:9000/ws/google.ai.generativelanguage.v1beta.GenerativeService"
        ));
    }

    #[test]
    fn test_rejects_non_websocket_endpoint() {
        let err = WsConnector::new()
            .with_endpoint("https://example.com")
            .url(&key())
            .unwrap_err();
        assert!(matches!(err, LiveError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_bad_api_version() {
        let err = WsConnector::new()
            .with_api_version("")
            .url(&key())
            .unwrap_err();
        assert!(matches!(err, LiveError::InvalidRequest(_)));
    }

    #[test]
    fn test_qualified_model() {
        assert_eq!(
            qualified_model("gemini-2.0-flash-exp"),
            "models/gemini-2.0-flash-exp"
        );
        assert_eq!(qualified_model("models/custom"), "models/custom");
    }

    #[tokio::test]
    async fn test_connect_fails_without_server() {
        // Nothing listens on port 9 locally, so the handshake must fail.
        let connector = WsConnector::new().with_endpoint("ws://127.0.0.1:9");
        let config = SessionConfig {
            model: "gemini-2.0-flash-exp".to_string(),
            tools: vec![],
            response_modality: Default::default(),
        };
        let result = connector.connect(&key(), config).await;
        assert!(matches!(result, Err(LiveError::WebSocket(_))));
    }

    /// Serves one scripted WebSocket connection on a random local port.
    async fn serve<F, Fut, T>(script: F) -> (WsConnector, JoinHandle<T>)
    where
        F: FnOnce(ServerSocket) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            script(ws).await
        });
        (WsConnector::new().with_endpoint(format!("ws://{addr}")), handle)
    }

    fn config() -> SessionConfig {
        SessionConfig {
            model: "gemini-2.0-flash-exp".to_string(),
            tools: vec![Tool::Search(ToolOptions::default())],
            response_modality: Default::default(),
        }
    }

    fn text_part(text: &str) -> Value {
        json!({ "serverContent": { "modelTurn": { "parts": [{ "text": text }] } } })
    }

    async fn recv_json(ws: &mut ServerSocket) -> Value {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("Expected a text frame, got {other:?}"),
        }
    }

    async fn send_json(ws: &mut ServerSocket, value: Value) {
        ws.send(WsMessage::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    /// Reads the setup message and acknowledges it.
    async fn complete_setup(ws: &mut ServerSocket) -> Value {
        let setup = recv_json(ws).await;
        send_json(ws, json!({ "setupComplete": {} })).await;
        setup
    }

    async fn close_with(ws: &mut ServerSocket, code: CloseCode, reason: &str) {
        ws.close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        }))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    }

    /// True once the client's close frame arrives.
    async fn wait_for_client_close(ws: &mut ServerSocket) -> bool {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(WsMessage::Close(_)) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    }

    async fn connect_err(connector: &WsConnector) -> LiveError {
        match connector.connect(&key(), config()).await {
            Ok(_) => panic!("Expected connect to fail"),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn test_session_round_trip_ends_after_turn_complete() {
        let (connector, server) = serve(|mut ws| async move {
            let setup = complete_setup(&mut ws).await;
            let turn = recv_json(&mut ws).await;
            send_json(&mut ws, text_part("Plotting now.")).await;
            let ack = recv_json(&mut ws).await;
            send_json(&mut ws, json!({ "serverContent": { "turnComplete": true } })).await;
            let closed = wait_for_client_close(&mut ws).await;
            (setup, turn, ack, closed)
        })
        .await;

        let mut session = connector.connect(&key(), config()).await.unwrap();
        session.send_turn("plot tides").await.unwrap();

        let first = session.next_message().await.unwrap().unwrap();
        assert!(!first.is_turn_complete());
        let call = FunctionCall {
            id: Some("1".to_string()),
            name: "f".to_string(),
            args: None,
        };
        session
            .send_tool_response(FunctionResponse::ok(&call))
            .await
            .unwrap();
        let last = session.next_message().await.unwrap().unwrap();
        assert!(last.is_turn_complete());
        assert!(session.next_message().await.unwrap().is_none());
        session.close().await.unwrap();

        let (setup, turn, ack, closed) = server.await.unwrap();
        assert_eq!(setup["setup"]["model"], "models/gemini-2.0-flash-exp");
        assert_eq!(setup["setup"]["tools"], json!([{ "google_search": {} }]));
        assert_eq!(turn["clientContent"]["turnComplete"], true);
        assert_eq!(
            turn["clientContent"]["turns"][0]["parts"][0]["text"],
            "plot tides"
        );
        assert_eq!(
            ack,
            json!({
                "toolResponse": {
                    "functionResponses": [{ "id": "1", "name": "f", "response": { "result": "ok" } }]
                }
            })
        );
        assert!(closed);
    }

    #[tokio::test]
    async fn test_normal_close_ends_stream() {
        let (connector, server) = serve(|mut ws| async move {
            complete_setup(&mut ws).await;
            send_json(&mut ws, text_part("partial")).await;
            close_with(&mut ws, CloseCode::Normal, "").await;
        })
        .await;

        let mut session = connector.connect(&key(), config()).await.unwrap();
        assert!(session.next_message().await.unwrap().is_some());
        assert!(session.next_message().await.unwrap().is_none());
        assert!(session.next_message().await.unwrap().is_none());
        session.close().await.unwrap();
        drop(session);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_close_is_a_transport_error() {
        let (connector, server) = serve(|mut ws| async move {
            complete_setup(&mut ws).await;
            send_json(&mut ws, text_part("partial")).await;
            close_with(&mut ws, CloseCode::Error, "Internal error").await;
        })
        .await;

        let mut session = connector.connect(&key(), config()).await.unwrap();
        assert!(session.next_message().await.unwrap().is_some());
        match session.next_message().await {
            Err(LiveError::ClosedByServer { code, reason }) => {
                assert_eq!(code, 1011);
                assert_eq!(reason, "Internal error");
            }
            other => panic!("Expected ClosedByServer, got {other:?}"),
        }
        assert!(session.next_message().await.unwrap().is_none());
        session.close().await.unwrap();
        drop(session);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_first_message_rejects_setup_and_closes() {
        let (connector, server) = serve(|mut ws| async move {
            recv_json(&mut ws).await;
            send_json(&mut ws, text_part("too early")).await;
            wait_for_client_close(&mut ws).await
        })
        .await;

        let err = connect_err(&connector).await;
        assert!(matches!(err, LiveError::SetupRejected(_)));
        assert!(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_close_during_setup() {
        let (connector, server) = serve(|mut ws| async move {
            recv_json(&mut ws).await;
            close_with(&mut ws, CloseCode::Normal, "").await;
        })
        .await;

        let err = connect_err(&connector).await;
        assert!(matches!(err, LiveError::ClosedDuringSetup));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_policy_close_during_setup_reports_reason() {
        let (connector, server) = serve(|mut ws| async move {
            recv_json(&mut ws).await;
            close_with(&mut ws, CloseCode::Policy, "model not found").await;
        })
        .await;

        match connect_err(&connector).await {
            LiveError::ClosedByServer { code, reason } => {
                assert_eq!(code, 1008);
                assert_eq!(reason, "model not found");
            }
            other => panic!("Expected ClosedByServer, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_binary_frames_decode_and_garbage_is_skipped() {
        let (connector, server) = serve(|mut ws| async move {
            complete_setup(&mut ws).await;
            ws.send(WsMessage::Binary(
                text_part("from binary").to_string().into_bytes().into(),
            ))
            .await
            .unwrap();
            ws.send(WsMessage::Text("not json".to_string().into()))
                .await
                .unwrap();
            ws.send(WsMessage::Text("\"just a string\"".to_string().into()))
                .await
                .unwrap();
            ws.send(WsMessage::Binary(vec![0xff, 0x00].into()))
                .await
                .unwrap();
            send_json(&mut ws, json!({ "serverContent": { "turnComplete": true } })).await;
            wait_for_client_close(&mut ws).await;
        })
        .await;

        let mut session = connector.connect(&key(), config()).await.unwrap();
        let first = session.next_message().await.unwrap().unwrap();
        let parts = first.server_content.unwrap().model_turn.unwrap().parts;
        assert_eq!(
            parts,
            vec![Part::Text {
                text: "from binary".to_string()
            }]
        );
        let last = session.next_message().await.unwrap().unwrap();
        assert!(last.is_turn_complete());
        assert!(session.next_message().await.unwrap().is_none());
        session.close().await.unwrap();
        server.await.unwrap();
    }
}
