//! Conversation Messages
//!
//! Content parts and turns exchanged with the multimodal model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input assembled by the controller
    User,
    /// Model output
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// Reference to a file previously uploaded to the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Opaque provider URI
    pub uri: String,

    /// MIME type of the uploaded bytes
    pub mime_type: String,

    /// Display name shown to the model
    pub display_name: String,
}

/// An atomic unit of turn input or output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPart {
    /// Free text
    Text { text: String },

    /// Uploaded file
    FileReference { file: FileHandle },

    /// Function call requested by the model
    ToolInvocation {
        name: String,
        arguments: Map<String, Value>,
    },

    /// Function response supplied by the controller
    ToolResult {
        name: String,
        response: Map<String, Value>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn file(file: FileHandle) -> Self {
        ContentPart::FileReference { file }
    }

    /// Tool result carrying `{"result": output}`
    pub fn tool_result(name: impl Into<String>, output: impl Into<String>) -> Self {
        let mut response = Map::new();
        response.insert("result".into(), Value::String(output.into()));
        ContentPart::ToolResult {
            name: name.into(),
            response,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_file_reference(&self) -> bool {
        matches!(self, ContentPart::FileReference { .. })
    }
}

/// One side of a round-trip
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,

    pub parts: Vec<ContentPart>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            parts,
            timestamp: Utc::now(),
        }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn model(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::Model, parts)
    }
}

/// Ordered turn history for one session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Get all turns
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
