//! # recon-runtime
//!
//! Runtime providers and configuration for the Recon agent.
//!
//! ## Providers
//!
//! - **Gemini**: Google Generative Language API with the File API
//!   for image uploads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recon_runtime::{GeminiProvider, ReconConfig};
//!
//! let config = ReconConfig::from_env();
//! config.validate()?;
//! let provider = GeminiProvider::from_recon(&config)?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tools(toolbox)
//!     .build()?;
//! ```

pub mod config;
pub mod gemini;

pub use config::ReconConfig;
pub use gemini::{GeminiConfig, GeminiProvider};

// Re-export core types for convenience
pub use recon_core::{
    Agent, AgentBuilder, AgentError, AgentEvent, EventSink, LlmProvider, Result, SessionOutcome,
    Toolbox,
};
