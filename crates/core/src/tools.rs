use gemini_live::{Tool, ToolOptions};

/// The tools every query enables: search first, then code execution.
///
/// To enable another tool, append it here.
pub fn default_tools() -> Vec<Tool> {
    vec![
        Tool::Search(ToolOptions::default()),
        Tool::CodeExecution(ToolOptions::default()),
    ]
}
