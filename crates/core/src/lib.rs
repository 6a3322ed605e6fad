//! Core of plotsmith: turns a topic into a prompt, runs it through a Gemini
//! Live session with search and code execution enabled, and saves the code
//! the model writes.

pub mod client;
pub mod output;
pub mod prompt;
pub mod tools;

pub use client::{ClientError, GeminiClient, QueryOutcome};
pub use prompt::{PromptBuilder, build_prompt};
pub use tools::default_tools;
