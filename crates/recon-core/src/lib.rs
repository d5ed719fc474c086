//! # recon-core
//!
//! Turn-loop controller for a multimodal geolocation agent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌────────────────┐  │
//! │  │  Turn Loop  │──│ Toolbox          │──│  LlmProvider   │  │
//! │  │  (session)  │  │ search │ crop    │  │  (Strategy)    │  │
//! │  └──────┬──────┘  └────────┬─────────┘  └────────────────┘  │
//! │         │                  │ BoundingBox::to_pixels          │
//! │         ▼                                                    │
//! │     EventSink  (console lines / WebSocket frames)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Providers, tools and sinks are traits so the loop can be driven by
//! scripted collaborators in tests.

pub mod bbox;
pub mod error;
pub mod events;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod termination;
pub mod tool;

pub use bbox::{BoundingBox, CoordinateSpace};
pub use error::{AgentError, Result};
pub use events::{AgentEvent, EventSink};
pub use message::{ContentPart, Conversation, FileHandle, Role, Turn};
pub use provider::{GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use session::{RetentionPolicy, Session, SessionOutcome, TerminationReason};
pub use tool::{CropTool, SearchTool, ToolKind, ToolSchema, Toolbox};
