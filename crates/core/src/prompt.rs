//! Builds the instruction sent to the model for a user topic.

/// First directive: gather information before plotting.
pub const SEARCH_DIRECTIVE: &str =
    "1. Search for relevant information regarding the topic the user will specify";

/// Second directive: turn what was found into a plotting script.
pub const PLOT_DIRECTIVE: &str =
    "2. Then, based on the information found, create a matplotlib graph in python.";

/// Wraps a user topic in the fixed instruction template.
///
/// The topic is embedded verbatim, with no validation; an empty topic yields
/// a prompt with an empty topic line.
pub fn build_prompt(topic: &str) -> String {
    format!("I want you to:\n{SEARCH_DIRECTIVE}\n{PLOT_DIRECTIVE}\n\nHere is the user topic: {topic}\n")
}

/// Holds a topic until the prompt is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    topic: String,
}

impl PromptBuilder {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn build(&self) -> String {
        build_prompt(&self.topic)
    }
}
