//! Session Events
//!
//! The controller reports progress through an [`EventSink`]; each delivery
//! surface decides how to render it.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Something worth telling the operator about
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Status line
    System { content: String },

    /// A new turn is starting (1-based)
    TurnStart { turn: usize },

    /// Model text
    AgentThought { content: String },

    /// Model requested a tool
    ToolCall {
        name: String,
        arguments: Map<String, Value>,
    },

    /// Tool output (already abbreviated for display)
    ToolResult { content: String },

    /// A crop was written to disk
    DerivedImage { path: PathBuf },

    /// Failure detail
    Error { content: String },
}

impl AgentEvent {
    pub fn system(content: impl Into<String>) -> Self {
        AgentEvent::System {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        AgentEvent::Error {
            content: content.into(),
        }
    }
}

/// Receiver for controller events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: AgentEvent);
}

/// Render `name({"k": v, ...})` the way call lines are shown to operators
pub fn format_call(name: &str, arguments: &Map<String, Value>) -> String {
    format!("{}({})", name, Value::Object(arguments.clone()))
}

/// First `max_chars` characters of `text` followed by `...`
pub fn preview(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}
