//! Process Configuration
//!
//! Everything is read from environment variables (after `.env` is loaded by
//! the binary). Both API keys are required for a session to work; the
//! console refuses to start without them, the server only warns.

use std::path::PathBuf;
use std::time::Duration;

use recon_core::provider::DEFAULT_MODEL;
use recon_core::{AgentError, CoordinateSpace, Result, RetentionPolicy};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Photos straight off a phone routinely exceed axum's 2 MB default
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 25;
const MIB: usize = 1024 * 1024;

/// Settings shared by the console runner and the server
#[derive(Clone)]
pub struct ReconConfig {
    pub gemini_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub model: String,
    pub gemini_base_url: String,
    pub tavily_base_url: String,
    pub max_turns: usize,
    pub coordinate_space: CoordinateSpace,
    pub retention: RetentionPolicy,
    pub http_timeout: Duration,
    /// Root for uploaded and derived images (server)
    pub static_dir: PathBuf,
    pub bind_addr: String,
    /// Largest request body `/upload` accepts, in bytes
    pub upload_limit_bytes: usize,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            tavily_api_key: None,
            model: DEFAULT_MODEL.into(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
            tavily_base_url: DEFAULT_TAVILY_BASE_URL.into(),
            max_turns: 10,
            coordinate_space: CoordinateSpace::Normalized,
            retention: RetentionPolicy::Keep,
            http_timeout: Duration::from_secs(120),
            static_dir: PathBuf::from("static"),
            bind_addr: "0.0.0.0:8000".into(),
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_MB * MIB,
        }
    }
}

impl std::fmt::Debug for ReconConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ReconConfig")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("model", &self.model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("tavily_base_url", &self.tavily_base_url)
            .field("max_turns", &self.max_turns)
            .field("coordinate_space", &self.coordinate_space)
            .field("retention", &self.retention)
            .field("http_timeout", &self.http_timeout)
            .field("static_dir", &self.static_dir)
            .field("bind_addr", &self.bind_addr)
            .field("upload_limit_bytes", &self.upload_limit_bytes)
            .finish()
    }
}

impl ReconConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Unparseable values fall back to
    /// defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
            model: get("MODEL_NAME").unwrap_or(defaults.model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            tavily_base_url: get("TAVILY_BASE_URL").unwrap_or(defaults.tavily_base_url),
            max_turns: parse_or("RECON_MAX_TURNS", get("RECON_MAX_TURNS"), defaults.max_turns)
                .max(1),
            coordinate_space: parse_or(
                "RECON_CROP_COORDS",
                get("RECON_CROP_COORDS"),
                defaults.coordinate_space,
            ),
            retention: parse_or(
                "RECON_CROP_RETENTION",
                get("RECON_CROP_RETENTION"),
                defaults.retention,
            ),
            http_timeout: Duration::from_secs(parse_or(
                "RECON_HTTP_TIMEOUT_SECS",
                get("RECON_HTTP_TIMEOUT_SECS"),
                defaults.http_timeout.as_secs(),
            )),
            static_dir: get("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            upload_limit_bytes: parse_or(
                "RECON_UPLOAD_LIMIT_MB",
                get("RECON_UPLOAD_LIMIT_MB"),
                DEFAULT_UPLOAD_LIMIT_MB,
            )
            .saturating_mul(MIB),
        }
    }

    /// Names of required variables that are missing
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini_api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if self.tavily_api_key.is_none() {
            missing.push("TAVILY_API_KEY");
        }
        missing
    }

    pub fn keys_configured(&self) -> bool {
        self.missing_keys().is_empty()
    }

    /// Fail if either API key is missing
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AgentError::Config(format!("missing {}", missing.join(", "))))
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(key, value = %raw, "ignoring invalid setting: {}", e);
            default
        }),
    }
}
