//! Runs one prompt through a Gemini Live session.
//!
//! The client opens a session, sends the prompt as a single turn, then reads
//! server messages until the stream ends. Text and execution output are
//! accumulated, the latest code fragment is kept, tool calls are acknowledged
//! inline, and the kept code is written to disk once the stream is over.

use crate::output::{self, DEFAULT_OUTPUT_PATH, WriteOutcome};
use gemini_live::{
    Connector, FunctionResponse, LiveError, LiveSession, Part, ResponseModality, ServerContent,
    SessionConfig, Tool, ToolCall,
};
use secrecy::SecretString;
use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{Instrument, Span, debug, info, info_span, warn};

/// Environment variable consulted when no key is passed explicitly.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

const SEPARATOR: &str = "-------------------------------";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No GEMINI_API_KEY provided in environment variables or constructor")]
    MissingApiKey,
    #[error(transparent)]
    Live(#[from] LiveError),
    #[error("Failed to write generated code to {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write to console: {0}")]
    Console(#[from] io::Error),
}

/// What a finished query produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// All response text, execution output and search content, in arrival order.
    pub response_text: String,
    /// The most recent code fragment, or empty if none arrived.
    pub code: String,
    /// Where the code was saved, if any was produced.
    pub written_to: Option<PathBuf>,
}

/// A client for one Gemini model.
pub struct GeminiClient<C> {
    connector: C,
    api_key: SecretString,
    model: String,
    output_path: PathBuf,
    span: Span,
}

impl<C: Connector> GeminiClient<C> {
    /// Creates a client.
    ///
    /// The key is `api_key` if given, else the `GEMINI_API_KEY` environment
    /// variable. With neither, this fails before the connector is touched.
    /// `model` defaults to [`DEFAULT_MODEL`].
    pub fn new(
        connector: C,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ClientError> {
        let api_key = resolve_api_key(api_key)?;
        let model = model
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let span = info_span!("gemini_client", model = %model);

        Ok(Self {
            connector,
            api_key,
            model,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            span,
        })
    }

    /// Sets the file the final code block is written to.
    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Sends `prompt` over a fresh session and echoes progress to `console`.
    ///
    /// The session is closed before returning, whether or not streaming
    /// succeeded. Transport errors are returned as-is; nothing is retried.
    pub async fn run_query<W: Write + Send>(
        &self,
        prompt: &str,
        tools: Vec<Tool>,
        modality: ResponseModality,
        console: &mut W,
    ) -> Result<QueryOutcome, ClientError> {
        self.query(prompt, tools, modality, console)
            .instrument(self.span.clone())
            .await
    }

    async fn query<W: Write + Send>(
        &self,
        prompt: &str,
        tools: Vec<Tool>,
        modality: ResponseModality,
        console: &mut W,
    ) -> Result<QueryOutcome, ClientError> {
        let tool_ids: Vec<&str> = tools.iter().map(Tool::identifier).collect();
        info!(tools = ?tool_ids, ?modality, "Opening Live session.");
        let config = SessionConfig {
            model: self.model.clone(),
            tools,
            response_modality: modality,
        };
        let mut session = self.connector.connect(&self.api_key, config).await?;

        let mut transcript = Transcript::new(console);
        let streamed = stream(session.as_mut(), prompt, &mut transcript).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close Live session cleanly.");
        }
        streamed?;
        info!("Live session closed.");

        let Transcript {
            console,
            text,
            code,
        } = transcript;
        let written_to = match output::write_code(&code, &self.output_path).map_err(|source| {
            ClientError::Output {
                path: self.output_path.clone(),
                source,
            }
        })? {
            WriteOutcome::Written(path) => {
                writeln!(console, "Python code written to {}", path.display())?;
                info!(path = %path.display(), bytes = code.len(), "Generated code saved.");
                Some(path)
            }
            WriteOutcome::NoCode => {
                writeln!(console, "No Python code to write.")?;
                info!("Model produced no code.");
                None
            }
        };

        Ok(QueryOutcome {
            response_text: text,
            code,
            written_to,
        })
    }
}

fn resolve_api_key(explicit: Option<String>) -> Result<SecretString, ClientError> {
    explicit
        .filter(|key| !key.is_empty())
        .or_else(|| env::var(API_KEY_VAR).ok().filter(|key| !key.is_empty()))
        .map(SecretString::from)
        .ok_or(ClientError::MissingApiKey)
}

/// Sends the prompt and consumes the stream until it ends.
async fn stream<W: Write + Send>(
    session: &mut dyn LiveSession,
    prompt: &str,
    transcript: &mut Transcript<'_, W>,
) -> Result<(), ClientError> {
    writeln!(transcript.console, "{prompt}")?;
    writeln!(transcript.console, "{SEPARATOR}")?;
    session.send_turn(prompt).await?;

    while let Some(message) = session.next_message().await? {
        debug!(?message, "Received Live API message.");

        if let Some(content) = &message.server_content {
            transcript.record_content(content)?;
        }
        if let Some(tool_call) = &message.tool_call {
            transcript.acknowledge(session, tool_call).await?;
        }
        if let Some(cancellation) = &message.tool_call_cancellation {
            info!(ids = ?cancellation.ids, "Server cancelled pending tool calls.");
        }
        if message.go_away.is_some() {
            warn!("Server announced it will close the connection soon.");
        }
    }
    Ok(())
}

/// Accumulated output of one query plus the console it is echoed to.
struct Transcript<'w, W> {
    console: &'w mut W,
    text: String,
    code: String,
}

impl<'w, W: Write + Send> Transcript<'w, W> {
    fn new(console: &'w mut W) -> Self {
        Self {
            console,
            text: String::new(),
            code: String::new(),
        }
    }

    fn record_content(&mut self, content: &ServerContent) -> io::Result<()> {
        if let Some(turn) = &content.model_turn {
            for part in &turn.parts {
                self.record_part(part)?;
            }
        }

        if let Some(rendered) = content
            .grounding_metadata
            .as_ref()
            .and_then(|metadata| metadata.rendered_content())
        {
            writeln!(self.console, "{rendered}")?;
            self.text.push('\n');
            self.text.push_str(rendered);
            self.text.push('\n');
        }
        Ok(())
    }

    fn record_part(&mut self, part: &Part) -> io::Result<()> {
        match part {
            Part::Text { text } => {
                if !text.is_empty() {
                    writeln!(self.console, "{text}")?;
                    self.text.push_str(text);
                }
            }
            Part::ExecutableCode { executable_code } => {
                let language = match executable_code.language.as_str() {
                    "" => "python".to_string(),
                    other => other.to_lowercase(),
                };
                writeln!(self.console, "{SEPARATOR}")?;
                writeln!(self.console, "``` {language}\n{}\n```", executable_code.code)?;
                writeln!(self.console, "{SEPARATOR}")?;
                // Last write wins: fragments replace each other.
                if !executable_code.code.is_empty() {
                    self.code.clone_from(&executable_code.code);
                }
            }
            Part::CodeExecutionResult {
                code_execution_result,
            } => {
                let output = &code_execution_result.output;
                writeln!(self.console, "{SEPARATOR}")?;
                writeln!(self.console, "```\n{output}\n```")?;
                writeln!(self.console, "{SEPARATOR}")?;
                self.text.push_str(&format!("\n```\n{output}\n```\n"));
                if let Some(outcome) = code_execution_result.outcome {
                    debug!(?outcome, "Code execution finished.");
                }
            }
            Part::Other(value) => debug!(part = %value, "Skipping unrecognized content part."),
        }
        Ok(())
    }

    /// Answers every function call with a canned success, one send per call.
    async fn acknowledge(
        &mut self,
        session: &mut dyn LiveSession,
        tool_call: &ToolCall,
    ) -> Result<(), ClientError> {
        for call in &tool_call.function_calls {
            let response = FunctionResponse::ok(call);
            writeln!(self.console, ">>> {response:?}")?;
            info!(id = ?call.id, name = %call.name, "Acknowledging tool call.");
            session.send_tool_response(response).await?;
        }
        Ok(())
    }
}
