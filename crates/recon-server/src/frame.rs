//! Outbound WebSocket Frames
//!
//! Every frame is a JSON object tagged by `type`. Text frames carry
//! `content`; crop notifications carry the public `url` of the new image.

use std::path::Path;

use serde::Serialize;

use recon_core::events::{AgentEvent, format_call};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    System { content: String },
    TurnStart { content: String },
    AgentThought { content: String },
    ToolCall { content: String },
    ToolResult { content: String },
    Error { content: String },
    SessionEnd { content: String },
    NewImage { url: String },
}

impl Frame {
    pub fn to_json(&self) -> String {
        // Plain string fields; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Public URL for a file stored under the static root
pub fn static_url(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("/static/{}", name)
}

/// Frames shown to the browser for one controller event
pub fn frames_for(event: &AgentEvent) -> Vec<Frame> {
    match event {
        AgentEvent::System { content } => vec![Frame::System {
            content: content.clone(),
        }],
        AgentEvent::TurnStart { turn } => vec![Frame::TurnStart {
            content: format!("\n--- Turn {} ---", turn),
        }],
        AgentEvent::AgentThought { content } => vec![Frame::AgentThought {
            content: format!("[Agent]: {}", content),
        }],
        AgentEvent::ToolCall { name, arguments } => vec![Frame::ToolCall {
            content: format!("[Tool Call]: {}", format_call(name, arguments)),
        }],
        AgentEvent::ToolResult { content } => vec![Frame::ToolResult {
            content: format!("[Tool Result]: {}", content),
        }],
        AgentEvent::DerivedImage { path } => vec![
            Frame::ToolResult {
                content: format!("[Tool Action]: Cropped image saved to {}", path.display()),
            },
            Frame::NewImage {
                url: static_url(path),
            },
        ],
        AgentEvent::Error { content } => vec![Frame::Error {
            content: content.clone(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};
    use std::path::PathBuf;

    fn json_frames(event: AgentEvent) -> Vec<Value> {
        frames_for(&event)
            .iter()
            .map(|f| serde_json::from_str(&f.to_json()).unwrap())
            .collect()
    }

    #[test]
    fn test_text_frames() {
        assert_eq!(
            json_frames(AgentEvent::system("Loading image...")),
            vec![json!({"type": "system", "content": "Loading image..."})]
        );
        assert_eq!(
            json_frames(AgentEvent::TurnStart { turn: 3 }),
            vec![json!({"type": "turn_start", "content": "\n--- Turn 3 ---"})]
        );
        assert_eq!(
            json_frames(AgentEvent::AgentThought {
                content: "Looks Iberian.".into()
            }),
            vec![json!({"type": "agent_thought", "content": "[Agent]: Looks Iberian."})]
        );
        assert_eq!(
            json_frames(AgentEvent::ToolResult {
                content: "- A: B (C)...".into()
            }),
            vec![json!({"type": "tool_result", "content": "[Tool Result]: - A: B (C)..."})]
        );
        assert_eq!(
            json_frames(AgentEvent::error("Crop Error: boom")),
            vec![json!({"type": "error", "content": "Crop Error: boom"})]
        );
    }

    #[test]
    fn test_tool_call_frame() {
        let mut arguments = Map::new();
        arguments.insert("query".into(), json!("Chez Pierre Lyon"));
        assert_eq!(
            json_frames(AgentEvent::ToolCall {
                name: "web_search".into(),
                arguments
            }),
            vec![json!({
                "type": "tool_call",
                "content": "[Tool Call]: web_search({\"query\":\"Chez Pierre Lyon\"})"
            })]
        );
    }

    #[test]
    fn test_derived_image_frames() {
        let frames = json_frames(AgentEvent::DerivedImage {
            path: PathBuf::from("static/street_crop_10_20.png"),
        });
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], "tool_result");
        assert_eq!(
            frames[0]["content"],
            "[Tool Action]: Cropped image saved to static/street_crop_10_20.png"
        );
        assert_eq!(
            frames[1],
            json!({"type": "new_image", "url": "/static/street_crop_10_20.png"})
        );
    }

    #[test]
    fn test_session_end_frame() {
        let frame = Frame::SessionEnd {
            content: "Session Concluded. Ready for next target.".into(),
        };
        assert_eq!(
            frame.to_json(),
            r#"{"type":"session_end","content":"Session Concluded. Ready for next target."}"#
        );
    }
}
