//! Tavily Search Client
//!
//! `POST {base}/search` with a bearer key; the response carries ranked
//! `results[] {title, url, content}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_MAX_RESULTS, SearchClient, SearchDepth, SearchResult};
use crate::error::{Result, ToolError};

pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, depth: SearchDepth) -> Result<Vec<SearchResult>> {
        let request = SearchRequest {
            query,
            search_depth: depth.as_str(),
            max_results: DEFAULT_MAX_RESULTS,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "tavily search failed");
            return Err(ToolError::Search(format!("HTTP {}: {}", status, body)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Search(format!("invalid response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Tavily"
    }
}
