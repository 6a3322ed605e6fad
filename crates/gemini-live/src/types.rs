//! Wire types for the Gemini Live `BidiGenerateContent` protocol.
//!
//! Outbound messages are externally tagged (`{"setup": {...}}`,
//! `{"clientContent": {...}}`, `{"toolResponse": {...}}`). Inbound messages are
//! a single object whose populated fields say what kind of message it is; all
//! of them are optional so unknown or partial messages still decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Client -> server ---

/// A message sent from this client to the Live API.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(BidiGenerateContentSetup),
    ClientContent(BidiGenerateContentClientContent),
    ToolResponse(BidiGenerateContentToolResponse),
}

/// The first message of every session.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidiGenerateContentSetup {
    /// Fully qualified model resource name, e.g. `models/gemini-2.0-flash-exp`.
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
}

/// The kind of output the model is asked to produce.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    #[default]
    Text,
    Audio,
}

/// A capability the model may invoke during the session.
///
/// Each variant carries its (currently empty) options object and serializes
/// as a single-key map, e.g. `{"google_search": {}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    #[serde(rename = "google_search")]
    Search(ToolOptions),
    #[serde(rename = "code_execution")]
    CodeExecution(ToolOptions),
}

/// Options for a [`Tool`]. The API accepts an empty object for both tools.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions {}

impl Tool {
    /// Stable identifier used in logs and on the console.
    pub fn identifier(&self) -> &'static str {
        match self {
            Tool::Search(_) => "search",
            Tool::CodeExecution(_) => "code-execution",
        }
    }

    pub fn options(&self) -> &ToolOptions {
        match self {
            Tool::Search(options) | Tool::CodeExecution(options) => options,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidiGenerateContentClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<TextPart>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![TextPart { text: text.into() }],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TextPart {
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidiGenerateContentToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// The client's answer to one [`FunctionCall`].
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

impl FunctionResponse {
    /// A canned `{"result": "ok"}` acknowledgment correlated with `call`.
    pub fn ok(call: &FunctionCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: serde_json::json!({ "result": "ok" }),
        }
    }
}

// --- Server -> client ---

/// A message received from the Live API.
///
/// `server_content` and `tool_call` are independent branches; a message may
/// carry either, both or neither.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCall>,
    pub tool_call_cancellation: Option<ToolCallCancellation>,
    pub go_away: Option<Value>,
    pub usage_metadata: Option<Value>,
}

impl ServerMessage {
    /// True when this message closes the model's turn.
    pub fn is_turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .is_some_and(|content| content.turn_complete)
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One piece of a model turn.
///
/// Variants are tried in order; anything that matches none of the known
/// shapes lands in `Other`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Part {
    ExecutableCode {
        #[serde(rename = "executableCode")]
        executable_code: ExecutableCode,
    },
    CodeExecutionResult {
        #[serde(rename = "codeExecutionResult")]
        code_execution_result: CodeExecutionResult,
    },
    Text {
        text: String,
    },
    Other(Value),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutableCode {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CodeExecutionResult {
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub output: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    OutcomeUnspecified,
    OutcomeOk,
    OutcomeFailed,
    OutcomeDeadlineExceeded,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    pub search_entry_point: Option<SearchEntryPoint>,
}

impl GroundingMetadata {
    /// The rendered search widget, when the server sent a non-empty one.
    pub fn rendered_content(&self) -> Option<&str> {
        self.search_entry_point
            .as_ref()
            .and_then(|entry| entry.rendered_content.as_deref())
            .filter(|rendered| !rendered.is_empty())
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntryPoint {
    pub rendered_content: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub id: Option<String>,
    pub name: String,
    pub args: Option<Value>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}
