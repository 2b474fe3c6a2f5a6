use derive_more::{Deref, Display, From};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of a collection (index) on the search service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Deref, Serialize, Deserialize)]
pub struct CollectionName(String);

impl From<&str> for CollectionName {
    fn from(name: &str) -> Self {
        CollectionName(name.to_string())
    }
}

impl CollectionName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of one bulk load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    /// Records sent to the service
    pub records: usize,
    /// Bulk requests issued
    pub requests: usize,
    /// Per-item failures reported inside otherwise successful responses
    pub item_errors: usize,
}

/// Body of a `_bulk` response; only the parts we look at
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl BulkResponse {
    pub fn failed_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.values().any(|result| result.error.is_some()))
            .count()
    }
}

/// Individual search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// Search result, as returned by `_search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    pub hits: SearchHits,
}

/// Where the search service lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
        }
    }
}

/// Retry policy for the read path (readiness probe and searches)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub backoff_factor_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Loader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub service: ServiceConfig,
    pub retry: RetryConfig,
}
