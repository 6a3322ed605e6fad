//! plotsmith: asks Gemini to research a topic and write a matplotlib script.
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Asking the user for a topic.
//! 4. Running the query and saving the generated script.

mod config;

use anyhow::Context;
use config::Config;
use gemini_live::{ResponseModality, WsConnector};
use plotsmith_core::{GeminiClient, PromptBuilder, default_tools};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TOPIC_QUESTION: &str = "Please enter a topic for which you'd like a graph to be generated: ";

/// Prints the question and reads one line from stdin, minus its line ending.
async fn read_topic() -> anyhow::Result<String> {
    {
        let mut stdout = std::io::stdout();
        write!(stdout, "{TOPIC_QUESTION}")?;
        stdout.flush()?;
    }

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read topic from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Build the client before prompting so a missing key fails fast ---
    let connector = WsConnector::new().with_api_version(config.api_version.clone());
    let client = GeminiClient::new(connector, None, Some(config.model.clone()))
        .context("Failed to initialize Gemini client")?
        .with_output_path(config.output_path.clone());
    info!(
        model = %client.model(),
        api_version = %config.api_version,
        output = %client.output_path().display(),
        "Client configured."
    );

    // --- 4. Ask for a topic and run the query ---
    let topic = read_topic().await?;
    let prompt = PromptBuilder::new(topic).build();
    let outcome = client
        .run_query(
            &prompt,
            default_tools(),
            ResponseModality::Text,
            &mut std::io::stdout(),
        )
        .await
        .context("Gemini query failed")?;

    info!(
        response_chars = outcome.response_text.len(),
        code_written = outcome.written_to.is_some(),
        "Query finished."
    );
    Ok(())
}
