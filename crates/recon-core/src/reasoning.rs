//! Turn Loop
//!
//! Drives one geolocation session: send the accumulated input to the model,
//! walk the returned parts in order, run whichever tool was requested, and
//! build the next turn's input from the outcome. The loop stops on a
//! termination phrase, a provider failure, or when the turn budget is spent.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::Instrument;

use crate::bbox::CoordinateSpace;
use crate::error::{AgentError, Result};
use crate::events::{AgentEvent, EventSink, preview};
use crate::message::{ContentPart, FileHandle, Turn};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::session::{RetentionPolicy, Session, SessionOutcome, SessionState, TerminationReason};
use crate::termination;
use crate::tool::{ToolKind, Toolbox, arg_str, crop_box_from_args};

/// Opening instruction sent with the target image
pub const INITIAL_PROMPT: &str = "Geolocate this image. Use tools to verify clues.";

/// Baseline input when a turn gives nothing better to continue with
pub const PROCEED_NUDGE: &str = "Proceed.";

/// Input after a turn with no tool call and no final answer
pub const CONTINUE_NUDGE: &str = "Please continue. Verify your hypothesis or give the final answer.";

/// Tool output reported after a successful crop
pub const CROP_SUCCESS: &str = "Image cropped successfully. See the new image attachment.";

/// Caption trailing an attached crop
pub const ZOOM_CAPTION: &str = "Here is the zoomed view.";

const TARGET_DISPLAY_NAME: &str = "GeoTarget";
const CROP_DISPLAY_NAME: &str = "ZoomedCrop";
const RESULT_PREVIEW_CHARS: usize = 200;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum model calls per session
    pub max_turns: usize,

    /// Generation options (model, system prompt, tool declarations)
    pub generation: GenerationOptions,

    /// How `crop_image` coordinates are interpreted
    pub coordinate_space: CoordinateSpace,

    /// What to do with crops when the session ends
    pub retention: RetentionPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            generation: GenerationOptions::default(),
            coordinate_space: CoordinateSpace::default(),
            retention: RetentionPolicy::default(),
        }
    }
}

/// Result of processing one model response
#[derive(Debug)]
enum TurnDirective {
    Continue(Vec<ContentPart>),
    Terminate(TerminationReason),
}

/// The geolocation agent
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Toolbox,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Toolbox, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Generation options with the toolbox's declarations filled in
    fn generation_options(&self) -> GenerationOptions {
        let mut options = self.config.generation.clone();
        if options.tools.is_empty() {
            options.tools = self.tools.schemas();
        }
        options
    }

    /// Run a full session on `image_path`, reporting through `sink`
    pub async fn run(&self, image_path: &Path, sink: &dyn EventSink) -> SessionOutcome {
        let mut session = Session::new(image_path);
        let span = tracing::info_span!("session", session_id = %session.id);

        async {
            tracing::info!(image = %image_path.display(), "session started");
            let outcome = self.drive(&mut session, sink).await;
            let removed = session.release(self.config.retention).await;
            tracing::info!(turns = session.turn, removed, ?outcome, "session finished");
            outcome
        }
        .instrument(span)
        .await
    }

    /// Run the turn loop on an existing session
    pub async fn drive(&self, session: &mut Session, sink: &dyn EventSink) -> SessionOutcome {
        let options = self.generation_options();

        sink.emit(AgentEvent::system(format!(
            "--- Recon (Powered by {}) ---",
            options.model
        )))
        .await;
        sink.emit(AgentEvent::system("Loading image...")).await;

        let target = match self
            .provider
            .upload_file(session.image_path(), TARGET_DISPLAY_NAME)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                let message = format!("Error uploading image: {}", e.user_message());
                return self.abort(session, sink, message, e).await;
            }
        };
        sink.emit(AgentEvent::system(format!(
            "Image uploaded: {}",
            target.display_name
        )))
        .await;

        let mut input = vec![ContentPart::file(target), ContentPart::text(INITIAL_PROMPT)];

        while session.turn < self.config.max_turns {
            session.turn += 1;
            sink.emit(AgentEvent::TurnStart { turn: session.turn }).await;

            match self.run_turn(session, input, &options, sink).await {
                Ok(TurnDirective::Continue(next)) => input = next,
                Ok(TurnDirective::Terminate(reason)) => {
                    session.transition(SessionState::Terminated);
                    return SessionOutcome::Terminated(reason);
                }
                Err(e) => {
                    let message = format!("Error in loop: {}", e.user_message());
                    return self.abort(session, sink, message, e).await;
                }
            }
        }

        tracing::info!(max_turns = self.config.max_turns, "turn budget exhausted");
        session.transition(SessionState::Terminated);
        SessionOutcome::BudgetExhausted
    }

    async fn abort(
        &self,
        session: &mut Session,
        sink: &dyn EventSink,
        message: String,
        error: AgentError,
    ) -> SessionOutcome {
        if error.is_transient() {
            tracing::warn!(turn = session.turn, "session aborted: {}", error);
        } else {
            tracing::error!(turn = session.turn, "session aborted: {}", error);
        }
        sink.emit(AgentEvent::error(message)).await;
        session.transition(SessionState::Terminated);
        SessionOutcome::Aborted(error.to_string())
    }

    /// One model round-trip plus whatever tool work it asks for
    async fn run_turn(
        &self,
        session: &mut Session,
        input: Vec<ContentPart>,
        options: &GenerationOptions,
        sink: &dyn EventSink,
    ) -> Result<TurnDirective> {
        session.transition(SessionState::AwaitingModel);
        session.conversation.push(Turn::user(input));

        let parts = self
            .provider
            .generate(session.conversation.turns(), options)
            .await?;
        tracing::debug!(turn = session.turn, parts = parts.len(), "model responded");
        session.conversation.push(Turn::model(parts.clone()));
        session.transition(SessionState::ProcessingParts);

        let mut next = vec![ContentPart::text(PROCEED_NUDGE)];
        let mut tool_called = false;

        for part in &parts {
            match part {
                ContentPart::Text { text } => {
                    sink.emit(AgentEvent::AgentThought {
                        content: text.clone(),
                    })
                    .await;

                    if let Some(reason) = termination::detect(text) {
                        tracing::info!(turn = session.turn, ?reason, "termination detected");
                        sink.emit(AgentEvent::system(reason.banner())).await;
                        return Ok(TurnDirective::Terminate(reason));
                    }
                }
                ContentPart::ToolInvocation { name, arguments } => {
                    tool_called = true;
                    session.transition(SessionState::ToolDispatch);
                    sink.emit(AgentEvent::ToolCall {
                        name: name.clone(),
                        arguments: arguments.clone(),
                    })
                    .await;
                    next = self.dispatch(session, name, arguments, sink).await;
                }
                other => {
                    tracing::debug!(part = ?other, "ignoring non-actionable model part");
                }
            }
        }

        let announced_final = parts
            .iter()
            .filter_map(ContentPart::as_text)
            .any(termination::mentions_final_answer);
        if !tool_called && !announced_final {
            next = vec![ContentPart::text(CONTINUE_NUDGE)];
        }

        session.transition(SessionState::Continuing);
        Ok(TurnDirective::Continue(next))
    }

    /// Execute one tool call and return the next turn's input
    async fn dispatch(
        &self,
        session: &mut Session,
        name: &str,
        arguments: &Map<String, Value>,
        sink: &dyn EventSink,
    ) -> Vec<ContentPart> {
        match ToolKind::from_name(name) {
            Some(ToolKind::WebSearch) => {
                let query = arg_str(arguments, "query", "");
                tracing::info!(tool = %ToolKind::WebSearch, query, "dispatching tool");
                let result = self.tools.search().web_search(query).await;
                sink.emit(AgentEvent::ToolResult {
                    content: preview(&result, RESULT_PREVIEW_CHARS),
                })
                .await;
                vec![ContentPart::tool_result(ToolKind::WebSearch.name(), result)]
            }
            Some(ToolKind::CropImage) => {
                tracing::info!(tool = %ToolKind::CropImage, "dispatching tool");
                match self.crop_and_upload(session, arguments, sink).await {
                    Ok(file) => vec![
                        ContentPart::tool_result(ToolKind::CropImage.name(), CROP_SUCCESS),
                        ContentPart::file(file),
                        ContentPart::text(ZOOM_CAPTION),
                    ],
                    Err(e) => {
                        tracing::warn!(tool = %ToolKind::CropImage, "crop failed: {}", e);
                        sink.emit(AgentEvent::error(format!("Crop Error: {}", e))).await;
                        vec![ContentPart::tool_result(
                            ToolKind::CropImage.name(),
                            format!("Failed to crop: {}", e),
                        )]
                    }
                }
            }
            None => {
                tracing::warn!(tool = name, "model requested an unknown tool");
                let message = format!("Unknown tool: {}", name);
                sink.emit(AgentEvent::error(message.clone())).await;
                vec![ContentPart::tool_result(name, message)]
            }
        }
    }

    /// Map the requested box, crop, and upload the derived image
    async fn crop_and_upload(
        &self,
        session: &mut Session,
        arguments: &Map<String, Value>,
        sink: &dyn EventSink,
    ) -> Result<FileHandle> {
        let requested = crop_box_from_args(arguments);
        let source = session.image_path().to_path_buf();

        let (width, height) = self.tools.crop().dimensions(&source).await?;
        let bbox = requested.resolve(self.config.coordinate_space, width, height);
        tracing::debug!(%requested, %bbox, space = ?self.config.coordinate_space, "crop box resolved");

        let derived = self.tools.crop().crop_image(&source, bbox).await?;
        session.record_derived(derived.clone());

        let file = self.provider.upload_file(&derived, CROP_DISPLAY_NAME).await?;
        sink.emit(AgentEvent::DerivedImage { path: derived }).await;
        Ok(file)
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Toolbox>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: None,
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: Toolbox) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.generation.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn max_turns(mut self, max: usize) -> Self {
        self.config.max_turns = max;
        self
    }

    pub fn coordinate_space(mut self, space: CoordinateSpace) -> Self {
        self.config.coordinate_space = space;
        self
    }

    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.config.retention = policy;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self
            .tools
            .ok_or_else(|| AgentError::Config("Toolbox is required".into()))?;

        Ok(Agent::new(provider, tools, self.config))
    }
}
