//! Turn-loop behaviour against scripted collaborators.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use recon_core::reasoning::{CONTINUE_NUDGE, CROP_SUCCESS, PROCEED_NUDGE, ZOOM_CAPTION};
use recon_core::{
    AgentBuilder, AgentError, AgentEvent, BoundingBox, ContentPart, CoordinateSpace, CropTool,
    EventSink, FileHandle, GenerationOptions, LlmProvider, Result, Role, SearchTool,
    SessionOutcome, TerminationReason, Toolbox, Turn,
};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<Vec<ContentPart>>>>,
    inputs: Mutex<Vec<Vec<ContentPart>>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    fail_upload_named: Option<&'static str>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<Vec<ContentPart>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    fn failing_upload(mut self, display_name: &'static str) -> Self {
        self.fail_upload_named = Some(display_name);
        self
    }

    fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    fn input(&self, call: usize) -> Vec<ContentPart> {
        self.inputs.lock().unwrap()[call].clone()
    }

    fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn upload_file(&self, path: &Path, display_name: &str) -> Result<FileHandle> {
        if self.fail_upload_named == Some(display_name) {
            return Err(AgentError::Upload("quota exceeded".into()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_path_buf(), display_name.to_string()));
        Ok(FileHandle {
            uri: format!("files/{}", display_name.to_lowercase()),
            mime_type: "image/jpeg".into(),
            display_name: display_name.into(),
        })
    }

    async fn generate(
        &self,
        conversation: &[Turn],
        _options: &GenerationOptions,
    ) -> Result<Vec<ContentPart>> {
        let last = conversation.last().expect("conversation has a user turn");
        assert_eq!(last.role, Role::User);
        self.inputs.lock().unwrap().push(last.parts.clone());

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![ContentPart::text("Still examining the vegetation.")]))
    }
}

struct StubSearch;

#[async_trait]
impl SearchTool for StubSearch {
    async fn web_search(&self, query: &str) -> String {
        format!("- Result for {}: snippet (https://example.com)", query)
    }
}

#[derive(Default)]
struct StubCrop {
    boxes: Mutex<Vec<BoundingBox>>,
}

#[async_trait]
impl CropTool for StubCrop {
    async fn dimensions(&self, _path: &Path) -> Result<(u32, u32)> {
        Ok((2000, 1000))
    }

    async fn crop_image(&self, path: &Path, bbox: BoundingBox) -> Result<PathBuf> {
        self.boxes.lock().unwrap().push(bbox);
        Ok(path.with_file_name(format!("target_crop_{}_{}.jpg", bbox.xmin, bbox.ymin)))
    }
}

struct FailingCrop;

#[async_trait]
impl CropTool for FailingCrop {
    async fn dimensions(&self, _path: &Path) -> Result<(u32, u32)> {
        Ok((640, 480))
    }

    async fn crop_image(&self, _path: &Path, _bbox: BoundingBox) -> Result<PathBuf> {
        Err(AgentError::ToolExecution("Error cropping image: decoder exploded".into()))
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl CollectingSink {
    fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::Error { content } => Some(content),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: AgentEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn call(name: &str, args: Value) -> ContentPart {
    ContentPart::ToolInvocation {
        name: name.into(),
        arguments: args.as_object().cloned().unwrap_or_else(Map::new),
    }
}

fn result_text(part: &ContentPart) -> String {
    match part {
        ContentPart::ToolResult { response, .. } => {
            response["result"].as_str().unwrap_or_default().to_string()
        }
        other => panic!("expected tool result, got {other:?}"),
    }
}

async fn run_with(
    provider: Arc<ScriptedProvider>,
    crop: Arc<dyn CropTool>,
    space: CoordinateSpace,
) -> (SessionOutcome, CollectingSink) {
    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(Toolbox::new(Arc::new(StubSearch), crop))
        .coordinate_space(space)
        .build()
        .unwrap();
    let sink = CollectingSink::default();
    let outcome = agent.run(Path::new("static/target.jpg"), &sink).await;
    (outcome, sink)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stop_signal_on_turn_two_ends_session() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![ContentPart::text("The signage looks Portuguese.")]),
        Ok(vec![ContentPart::text("Report complete. [STOP]")]),
    ]));

    let (outcome, sink) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert_eq!(outcome, SessionOutcome::Terminated(TerminationReason::StopSignal));
    assert_eq!(provider.calls(), 2);
    assert!(sink.events().contains(&AgentEvent::system(
        "[Process Completed - Stop Signal Received]"
    )));
}

#[tokio::test]
async fn test_first_turn_sends_target_and_prompt() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(vec![ContentPart::text(
        "[STOP]",
    )])]));

    run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    let first = provider.input(0);
    assert_eq!(first.len(), 2);
    assert!(first[0].is_file_reference());
    assert_eq!(first[1].as_text(), Some("Geolocate this image. Use tools to verify clues."));
    assert_eq!(provider.uploads()[0].1, "GeoTarget");
}

#[tokio::test]
async fn test_budget_exhaustion_makes_exactly_ten_calls() {
    let provider = Arc::new(ScriptedProvider::new(Vec::new()));

    let (outcome, sink) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert_eq!(outcome, SessionOutcome::BudgetExhausted);
    assert_eq!(provider.calls(), 10);
    assert!(sink.errors().is_empty());
    for call in 1..10 {
        let input = provider.input(call);
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].as_text(), Some(CONTINUE_NUDGE));
    }
    let turn_starts = sink
        .events()
        .iter()
        .filter(|e| matches!(e, AgentEvent::TurnStart { .. }))
        .count();
    assert_eq!(turn_starts, 10);
}

#[tokio::test]
async fn test_failing_crop_feeds_back_single_error_result() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![call(
            "crop_image",
            json!({"box_ymin": 100, "box_xmin": 100, "box_ymax": 400, "box_xmax": 400}),
        )]),
        Ok(vec![ContentPart::text("[STOP]")]),
    ]));

    let (outcome, sink) =
        run_with(provider.clone(), Arc::new(FailingCrop), CoordinateSpace::Normalized).await;

    assert_eq!(outcome, SessionOutcome::Terminated(TerminationReason::StopSignal));
    let second = provider.input(1);
    assert_eq!(second.len(), 1);
    assert!(!second.iter().any(ContentPart::is_file_reference));
    let text = result_text(&second[0]);
    assert!(text.starts_with("Failed to crop: "), "{text}");
    assert!(text.contains("decoder exploded"));
    assert_eq!(sink.errors().len(), 1);
    assert!(sink.errors()[0].starts_with("Crop Error: "));
}

#[tokio::test]
async fn test_successful_crop_attaches_derived_image() {
    let crop = Arc::new(StubCrop::default());
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![
            ContentPart::text("Let me zoom on the sign."),
            call(
                "crop_image",
                json!({"box_ymin": 100, "box_xmin": 200, "box_ymax": 500, "box_xmax": 800}),
            ),
        ]),
        Ok(vec![ContentPart::text("[STOP]")]),
    ]));

    let (_, sink) = run_with(provider.clone(), crop.clone(), CoordinateSpace::Normalized).await;

    assert_eq!(
        crop.boxes.lock().unwrap().as_slice(),
        &[BoundingBox::new(100, 400, 500, 1600)]
    );

    let second = provider.input(1);
    assert_eq!(second.len(), 3);
    assert_eq!(result_text(&second[0]), CROP_SUCCESS);
    assert!(second[1].is_file_reference());
    assert_eq!(second[2].as_text(), Some(ZOOM_CAPTION));

    let uploads = provider.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[1].0, PathBuf::from("static/target_crop_400_100.jpg"));
    assert_eq!(uploads[1].1, "ZoomedCrop");

    assert!(sink.events().contains(&AgentEvent::DerivedImage {
        path: PathBuf::from("static/target_crop_400_100.jpg"),
    }));
}

#[tokio::test]
async fn test_absolute_coordinates_are_trimmed_to_frame() {
    let crop = Arc::new(StubCrop::default());
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![call(
            "crop_image",
            json!({"box_ymin": 10, "box_xmin": 20, "box_ymax": 30, "box_xmax": 40}),
        )]),
        Ok(vec![call(
            "crop_image",
            json!({"box_ymin": 900, "box_xmin": 1500, "box_ymax": 1400, "box_xmax": 2600}),
        )]),
        Ok(vec![ContentPart::text("[STOP]")]),
    ]));

    let (outcome, sink) = run_with(provider.clone(), crop.clone(), CoordinateSpace::Absolute).await;

    assert!(!outcome.is_aborted());
    assert!(sink.errors().is_empty(), "{:?}", sink.errors());
    // StubCrop reports a 2000x1000 image
    assert_eq!(
        crop.boxes.lock().unwrap().as_slice(),
        &[
            BoundingBox::new(10, 20, 30, 40),
            BoundingBox::new(900, 1500, 1000, 2000),
        ]
    );
    assert_eq!(result_text(&provider.input(2)[0]), CROP_SUCCESS);
}

#[tokio::test]
async fn test_crop_upload_failure_is_tool_output() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![
            Ok(vec![call("crop_image", json!({}))]),
            Ok(vec![ContentPart::text("[STOP]")]),
        ])
        .failing_upload("ZoomedCrop"),
    );

    let (outcome, _) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert!(!outcome.is_aborted());
    let second = provider.input(1);
    assert_eq!(second.len(), 1);
    assert!(result_text(&second[0]).contains("quota exceeded"));
}

#[tokio::test]
async fn test_crop_is_announced_only_after_upload() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![
            Ok(vec![call("crop_image", json!({}))]),
            Ok(vec![ContentPart::text("[STOP]")]),
        ])
        .failing_upload("ZoomedCrop"),
    );

    let (_, sink) =
        run_with(provider, Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert!(
        !sink
            .events()
            .iter()
            .any(|e| matches!(e, AgentEvent::DerivedImage { .. }))
    );
    assert_eq!(sink.errors().len(), 1);
    assert!(sink.errors()[0].starts_with("Crop Error:"));
}

#[tokio::test]
async fn test_web_search_result_becomes_next_input() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![call("web_search", json!({"query": "Pastelaria Lisboa"}))]),
        Ok(vec![ContentPart::text("[STOP]")]),
    ]));

    let (_, sink) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    let second = provider.input(1);
    assert_eq!(second.len(), 1);
    match &second[0] {
        ContentPart::ToolResult { name, response } => {
            assert_eq!(name, "web_search");
            assert_eq!(
                response["result"],
                "- Result for Pastelaria Lisboa: snippet (https://example.com)"
            );
        }
        other => panic!("unexpected part {other:?}"),
    }
    assert!(sink.events().iter().any(|e| matches!(
        e,
        AgentEvent::ToolCall { name, .. } if name == "web_search"
    )));
}

#[tokio::test]
async fn test_unknown_tool_is_reported_back() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![call("teleport", json!({"to": "Lisbon"}))]),
        Ok(vec![ContentPart::text("[STOP]")]),
    ]));

    let (_, sink) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    let second = provider.input(1);
    assert_eq!(result_text(&second[0]), "Unknown tool: teleport");
    assert_eq!(sink.errors(), vec!["Unknown tool: teleport".to_string()]);
}

#[tokio::test]
async fn test_provider_failure_aborts_session() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(AgentError::Provider(
        "HTTP 400: {\"error\": \"raw upstream body\"}".into(),
    ))]));

    let (outcome, sink) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert!(outcome.is_aborted());
    assert_eq!(provider.calls(), 1);
    assert_eq!(sink.errors().len(), 1);
    assert_eq!(
        sink.errors()[0],
        "Error in loop: The AI service rejected the request."
    );
}

#[tokio::test]
async fn test_target_upload_failure_aborts_before_any_turn() {
    let provider = Arc::new(ScriptedProvider::new(Vec::new()).failing_upload("GeoTarget"));

    let (outcome, sink) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert!(outcome.is_aborted());
    assert_eq!(provider.calls(), 0);
    assert_eq!(
        sink.errors(),
        vec!["Error uploading image: Could not upload the image.".to_string()]
    );
    assert!(!sink
        .events()
        .iter()
        .any(|e| matches!(e, AgentEvent::TurnStart { .. })));
}

#[tokio::test]
async fn test_final_answer_without_coordinates_gets_weak_nudge() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(vec![ContentPart::text("Final Answer pending one more check.")]),
        Ok(vec![ContentPart::text("[STOP]")]),
    ]));

    run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    let second = provider.input(1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].as_text(), Some(PROCEED_NUDGE));
}

#[tokio::test]
async fn test_final_answer_with_coordinates_terminates() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(vec![ContentPart::text(
        "FINAL ANSWER. Coordinates: 38.7139, -9.1394",
    )])]));

    let (outcome, _) =
        run_with(provider.clone(), Arc::new(StubCrop::default()), CoordinateSpace::Normalized).await;

    assert_eq!(outcome, SessionOutcome::Terminated(TerminationReason::FinalAnswer));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_parts_after_termination_are_ignored() {
    let crop = Arc::new(StubCrop::default());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(vec![
        ContentPart::text("Impossible to place: generic stock photo."),
        call("crop_image", json!({})),
    ])]));

    let (outcome, _) = run_with(provider, crop.clone(), CoordinateSpace::Normalized).await;

    assert_eq!(outcome, SessionOutcome::Terminated(TerminationReason::Impossible));
    assert!(crop.boxes.lock().unwrap().is_empty());
}
