//! Console Event Sink

use async_trait::async_trait;

use recon_core::events::{AgentEvent, format_call};
use recon_core::EventSink;

/// Prints controller events as prefixed lines on stdout
pub struct ConsoleSink;

/// Lines printed for one event
pub fn render(event: &AgentEvent) -> String {
    match event {
        AgentEvent::System { content } | AgentEvent::Error { content } => content.clone(),
        AgentEvent::TurnStart { turn } => format!("\n--- Turn {} ---", turn),
        AgentEvent::AgentThought { content } => format!("[Agent]: {}", content),
        AgentEvent::ToolCall { name, arguments } => {
            format!("[Tool Call]: {}", format_call(name, arguments))
        }
        AgentEvent::ToolResult { content } => format!("[Tool Result]: {}", content),
        AgentEvent::DerivedImage { path } => {
            format!("[Tool Action]: Cropped image saved to {}", path.display())
        }
    }
}

#[async_trait]
impl EventSink for ConsoleSink {
    async fn emit(&self, event: AgentEvent) {
        println!("{}", render(&event));
    }
}
