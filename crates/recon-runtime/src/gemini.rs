//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` for the Google Generative Language API.
//! Images go through the File API (resumable upload) and are referenced in
//! later turns by URI.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use recon_core::{
    error::{AgentError, Result},
    message::{ContentPart, FileHandle, Role, Turn},
    provider::{GenerationOptions, LlmProvider},
    tool::ToolSchema,
};

use crate::config::ReconConfig;

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Build from process configuration; an unset key is left empty and
    /// surfaces as an auth failure on first use.
    pub fn from_recon(config: &ReconConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone().unwrap_or_default(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            timeout: config.http_timeout,
        }
    }
}

/// Gemini LLM provider
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Create from process configuration
    pub fn from_recon(config: &ReconConfig) -> Result<Self> {
        Self::from_config(GeminiConfig::from_recon(config))
    }

    /// Build the `generateContent` request body
    fn build_request(conversation: &[Turn], options: &GenerationOptions) -> GenerateRequest {
        let contents = conversation
            .iter()
            .filter(|turn| !turn.parts.is_empty())
            .map(|turn| WireContent {
                role: match turn.role {
                    Role::User => "user".into(),
                    Role::Model => "model".into(),
                },
                parts: turn.parts.iter().map(WirePart::from_part).collect(),
            })
            .collect();

        let system_instruction = options.system_prompt.as_ref().map(|prompt| WireContent {
            role: "user".into(),
            parts: vec![WirePart {
                text: Some(prompt.clone()),
                ..Default::default()
            }],
        });

        let tools = if options.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTools {
                function_declarations: options.tools.iter().map(declaration).collect(),
            }]
        };

        GenerateRequest {
            contents,
            system_instruction,
            tools,
            generation_config: WireGenerationConfig {
                max_output_tokens: options.max_tokens,
                temperature: options.temperature,
            },
        }
    }

    /// Convert the first candidate into content parts
    fn convert_response(response: GenerateResponse) -> Result<Vec<ContentPart>> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".into());
            return Err(AgentError::Provider(format!("empty response: {}", reason)));
        };

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(WirePart::into_part)
            .collect::<Vec<_>>();

        if parts.is_empty() {
            tracing::warn!(
                finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
                "gemini returned a candidate without usable parts"
            );
        }
        Ok(parts)
    }

    async fn start_upload(&self, len: usize, mime_type: &str, display_name: &str) -> Result<String> {
        let url = format!("{}/upload/v1beta/files", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", len.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| AgentError::Upload(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AgentError::Upload("missing x-goog-upload-url header".into()))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1beta/models", self.config.base_url);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn upload_file(&self, path: &Path, display_name: &str) -> Result<FileHandle> {
        let bytes = tokio::fs::read(path).await?;
        let mime_type = mime_for_path(path);
        tracing::debug!(path = %path.display(), mime_type, bytes = bytes.len(), "uploading file");

        let upload_url = self.start_upload(bytes.len(), mime_type, display_name).await?;

        let response = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AgentError::Upload(e.to_string()))?;

        let uploaded: UploadResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Upload(format!("invalid upload response: {}", e)))?;

        Ok(FileHandle {
            uri: uploaded.file.uri,
            mime_type: uploaded.file.mime_type.unwrap_or_else(|| mime_type.into()),
            display_name: uploaded
                .file
                .display_name
                .unwrap_or_else(|| display_name.into()),
        })
    }

    async fn generate(
        &self,
        conversation: &[Turn],
        options: &GenerationOptions,
    ) -> Result<Vec<ContentPart>> {
        let request = Self::build_request(conversation, options);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, options.model
        );

        tracing::debug!(
            model = %options.model,
            contents = request.contents.len(),
            tools = options.tools.len(),
            "gemini generate request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(e.to_string())
                }
            })?;

        let body: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid response: {}", e)))?;

        Self::convert_response(body)
    }
}

/// Map non-2xx responses onto the error taxonomy
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, body = %body, "gemini API error");

    let detail = format!("HTTP {}: {}", status, body);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    })
}

/// MIME type from the file extension
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "application/octet-stream",
    }
}

fn declaration(schema: &ToolSchema) -> WireFunctionDeclaration {
    WireFunctionDeclaration {
        name: schema.name.clone(),
        description: schema.description.clone(),
        parameters: uppercase_types(&schema.parameters_json()),
    }
}

/// Gemini expects upper-case JSON Schema type names
fn uppercase_types(schema: &Value) -> Value {
    match schema {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(key, value)| {
                    let converted = match (key.as_str(), value) {
                        ("type", Value::String(t)) => Value::String(t.to_uppercase()),
                        ("properties", Value::Object(props)) => Value::Object(
                            props
                                .iter()
                                .map(|(k, v)| (k.clone(), uppercase_types(v)))
                                .collect(),
                        ),
                        ("items", v) => uppercase_types(v),
                        (_, v) => v.clone(),
                    };
                    (key.clone(), converted)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTools>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct WireContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<WireFileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    /// Thinking models flag internal reasoning parts
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

impl WirePart {
    fn from_part(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self {
                text: Some(text.clone()),
                ..Default::default()
            },
            ContentPart::FileReference { file } => Self {
                file_data: Some(WireFileData {
                    mime_type: file.mime_type.clone(),
                    file_uri: file.uri.clone(),
                }),
                ..Default::default()
            },
            ContentPart::ToolInvocation { name, arguments } => Self {
                function_call: Some(WireFunctionCall {
                    name: name.clone(),
                    args: arguments.clone(),
                }),
                ..Default::default()
            },
            ContentPart::ToolResult { name, response } => Self {
                function_response: Some(WireFunctionResponse {
                    name: name.clone(),
                    response: response.clone(),
                }),
                ..Default::default()
            },
        }
    }

    fn into_part(self) -> Option<ContentPart> {
        if self.thought == Some(true) {
            return None;
        }
        if let Some(call) = self.function_call {
            return Some(ContentPart::ToolInvocation {
                name: call.name,
                arguments: call.args,
            });
        }
        if let Some(text) = self.text.filter(|t| !t.is_empty()) {
            return Some(ContentPart::text(text));
        }
        if let Some(file) = self.file_data {
            return Some(ContentPart::file(FileHandle {
                display_name: file.file_uri.clone(),
                uri: file.file_uri,
                mime_type: file.mime_type,
            }));
        }
        self.function_response
            .map(|r| ContentPart::ToolResult {
                name: r.name,
                response: r.response,
            })
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireFunctionResponse {
    name: String,
    #[serde(default)]
    response: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}
