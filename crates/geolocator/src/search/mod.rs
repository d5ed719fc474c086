//! Search Integration
//!
//! Abstractions and implementations for web search backends.

mod fixed;
pub mod tavily;

pub use fixed::FixedSearchClient;
pub use tavily::TavilyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default number of results requested from the backend
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// One ranked search hit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

impl SearchDepth {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

/// Search client trait (Strategy pattern)
///
/// Results come back in ranking order.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, depth: SearchDepth) -> Result<Vec<SearchResult>>;

    /// Backend name
    fn name(&self) -> &str;
}
