//! Web Search Tool
//!
//! Turns search hits into the short text block the model reads back.

use std::sync::Arc;

use async_trait::async_trait;

use recon_core::SearchTool;

use crate::error::ToolError;
use crate::search::{SearchClient, SearchDepth, SearchResult};

/// Hits forwarded to the model
pub const MAX_SHOWN_RESULTS: usize = 3;

pub struct WebSearch {
    client: Arc<dyn SearchClient>,
}

impl WebSearch {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }
}

fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".into();
    }
    results
        .iter()
        .take(MAX_SHOWN_RESULTS)
        .map(|r| format!("- {}: {} ({})", r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl SearchTool for WebSearch {
    async fn web_search(&self, query: &str) -> String {
        tracing::info!(tool = "web_search", backend = self.client.name(), "[Tool: Web Search] Searching for: '{}'...", query);

        match self.client.search(query, SearchDepth::Advanced).await {
            Ok(results) => format_results(&results),
            Err(err @ ToolError::Search(_)) => err.to_string(),
            Err(err) => ToolError::Search(err.to_string()).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FixedSearchClient;

    fn hit(n: usize) -> SearchResult {
        SearchResult {
            title: format!("Title {n}"),
            snippet: format!("Snippet {n}"),
            url: format!("https://example.org/{n}"),
        }
    }

    #[tokio::test]
    async fn test_no_results() {
        let tool = WebSearch::new(Arc::new(FixedSearchClient::new(Vec::new())));
        assert_eq!(tool.web_search("nothing here").await, "No results found.");
    }

    #[tokio::test]
    async fn test_keeps_top_three_in_order() {
        let client = Arc::new(FixedSearchClient::new((1..=5).map(hit).collect()));
        let tool = WebSearch::new(client.clone());

        let output = tool.web_search("Rue de la Paix street sign").await;
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "- Title 1: Snippet 1 (https://example.org/1)",
                "- Title 2: Snippet 2 (https://example.org/2)",
                "- Title 3: Snippet 3 (https://example.org/3)",
            ]
        );
        assert_eq!(client.queries(), vec!["Rue de la Paix street sign"]);
    }

    #[tokio::test]
    async fn test_failure_becomes_text() {
        let tool = WebSearch::new(Arc::new(FixedSearchClient::failing("rate limited")));
        assert_eq!(
            tool.web_search("vegetation in South Africa").await,
            "Error performing search: rate limited"
        );
    }
}
