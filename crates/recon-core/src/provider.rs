//! LLM Provider Strategy Pattern
//!
//! Defines the interface the turn loop uses to talk to a multimodal model.
//! A provider is stateless with respect to the conversation: every call
//! receives the full turn history, so sessions never share provider state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recon_core::provider::{GenerationOptions, LlmProvider};
//!
//! let file = provider.upload_file(path, "GeoTarget").await?;
//! let parts = provider.generate(conversation.turns(), &options).await?;
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{ContentPart, FileHandle, Turn};
use crate::tool::ToolSchema;

/// Model used when `MODEL_NAME` is unset
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-2.0-flash-exp")
    pub model: String,

    /// Temperature for sampling
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// System instruction sent alongside every request
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Function declarations the model may call
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
}

fn default_max_tokens() -> u32 {
    8192
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: None,
            max_tokens: default_max_tokens(),
            system_prompt: None,
            tools: Vec::new(),
        }
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new multimodal backends.
/// The controller works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Check if the provider is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool>;

    /// Upload a local file and return a handle usable in later turns
    async fn upload_file(&self, path: &Path, display_name: &str) -> Result<FileHandle>;

    /// Send the whole conversation and return the model's parts in order
    async fn generate(
        &self,
        conversation: &[Turn],
        options: &GenerationOptions,
    ) -> Result<Vec<ContentPart>>;
}
