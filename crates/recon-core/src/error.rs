//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// File upload to the provider failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Check if error is transient.
    ///
    /// Nothing retries on this today; it only decides the log level.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_) | AgentError::RateLimited(_) | AgentError::Io(_)
        )
    }

    /// Message safe to show operators and browsers.
    ///
    /// Raw provider bodies stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(_) => "The AI service rejected the request.".into(),
            AgentError::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::Upload(_) => "Could not upload the image.".into(),
            AgentError::ToolExecution(msg) => format!("Tool error: {}", msg),
            AgentError::Config(msg) => format!("The server is misconfigured: {}", msg),
            AgentError::RateLimited(_) => "Too many requests. Please wait a moment.".into(),
            AgentError::Auth(_) => "Authentication failed. Please check your API keys.".into(),
            AgentError::Io(_) => "A local file could not be read.".into(),
        }
    }
}
