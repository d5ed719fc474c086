//! Error Types for the Geolocation Tools

use recon_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Error performing search: {0}")]
    Search(String),

    #[error("Error cropping image: {0}")]
    Crop(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for AgentError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Config(msg) => AgentError::Config(msg),
            other => AgentError::ToolExecution(other.to_string()),
        }
    }
}
