use gemini_live::ws::DEFAULT_API_VERSION;
use plotsmith_core::{client::DEFAULT_MODEL, output::DEFAULT_OUTPUT_PATH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings loaded from the environment at startup.
///
/// The API key is not part of this; the client reads `GEMINI_API_KEY` itself.
#[derive(Clone, Debug)]
pub struct Config {
    pub model: String,
    pub api_version: String,
    pub output_path: PathBuf,
    /// `RUST_LOG` directives, e.g. `info` or `plotsmith=debug,gemini_live=trace`.
    pub log_filter: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let api_version = std::env::var("GEMINI_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        if api_version.is_empty() || api_version.contains('/') {
            return Err(ConfigError::InvalidValue(
                "GEMINI_API_VERSION".to_string(),
                format!("'{}' is not a valid API version", api_version),
            ));
        }

        let output_path = std::env::var("PLOTSMITH_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_PATH));

        let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(&log_filter).map_err(|e| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log filter: {}", log_filter, e),
            )
        })?;

        Ok(Self {
            model,
            api_version,
            output_path,
            log_filter,
        })
    }
}
