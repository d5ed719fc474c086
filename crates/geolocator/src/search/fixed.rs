//! Fixed Search Client
//!
//! Returns a canned result list (or a canned failure) for every query.
//! Used in tests and offline runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{SearchClient, SearchDepth, SearchResult};
use crate::error::{Result, ToolError};

#[derive(Default)]
pub struct FixedSearchClient {
    results: Vec<SearchResult>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FixedSearchClient {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    /// Client whose every search fails with `detail`
    pub fn failing(detail: impl Into<String>) -> Self {
        Self {
            failure: Some(detail.into()),
            ..Default::default()
        }
    }

    /// Queries seen so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchClient for FixedSearchClient {
    async fn search(&self, query: &str, _depth: SearchDepth) -> Result<Vec<SearchResult>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        match &self.failure {
            Some(detail) => Err(ToolError::Search(detail.clone())),
            None => Ok(self.results.clone()),
        }
    }

    fn name(&self) -> &str {
        "Fixed"
    }
}
