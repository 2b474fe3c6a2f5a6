use crate::engine::ensure_success;
use crate::error::{LoaderError, Result};
use crate::types::{CollectionName, RetryConfig, SearchHit, SearchResponse};
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::sleep;

/// Read side of the search service. Requests here are retried on transient
/// 5xx answers; the write side never is.
pub struct SearchClient {
    client: Client,
    base_url: String,
    backoff: ExponentialBuilder,
}

impl SearchClient {
    pub fn new(client: Client, base_url: impl Into<String>, retry: &RetryConfig) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(retry.backoff_factor_ms))
            .with_max_delay(Duration::from_millis(retry.max_delay_ms))
            .with_max_times(retry.max_retries);

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            backoff,
        }
    }

    /// Probe the service root until it answers with a success status
    pub async fn wait_until_ready(&self) -> Result<()> {
        let url = format!("{}/", self.base_url);
        let client = &self.client;
        let target = url.as_str();

        let attempt = move || async move {
            let response = client.get(target).send().await?;
            ensure_success(response).await?;
            Ok::<(), LoaderError>(())
        };

        attempt
            .retry(self.backoff)
            .sleep(sleep)
            .when(|err: &LoaderError| err.is_transient() || err.is_connect())
            .notify(|err: &LoaderError, delay: Duration| {
                tracing::warn!("Service not ready, retrying in {}ms: {}", delay.as_millis(), err);
            })
            .await?;

        tracing::info!("Search service ready at {}", self.base_url);
        Ok(())
    }

    /// Run one query document against `collection`
    pub async fn search(
        &self,
        collection: &CollectionName,
        query: &serde_json::Value,
    ) -> Result<SearchResponse> {
        let url = format!("{}/{}/_search", self.base_url, collection);
        let client = &self.client;
        let target = url.as_str();

        let attempt = move || async move {
            let response = client.get(target).json(query).send().await?;
            let response = ensure_success(response).await?;
            Ok::<SearchResponse, LoaderError>(response.json::<SearchResponse>().await?)
        };

        let result = attempt
            .retry(self.backoff)
            .sleep(sleep)
            .when(|err: &LoaderError| err.is_transient())
            .notify(|err: &LoaderError, delay: Duration| {
                tracing::warn!("Search failed, retrying in {}ms: {}", delay.as_millis(), err);
            })
            .await?;

        tracing::debug!(
            "Search on '{}' returned {} hits in {}ms",
            collection,
            result.hits.hits.len(),
            result.took
        );
        Ok(result)
    }
}

/// Tab-separated `id`, `score` and `field` table, one hit per line
pub fn render_hits(hits: &[SearchHit], field: &str) -> String {
    let mut out = format!("id\tscore\t{field}\n");
    for hit in hits {
        let score = hit
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let value = match hit.source.get(field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let _ = writeln!(out, "{}\t{}\t{}", hit.id, score, value);
    }
    out
}

/// The `query.multi_match.query` terms of a query document, when it has them
pub fn query_terms(query: &serde_json::Value) -> Option<&str> {
    query
        .pointer("/query/multi_match/query")
        .and_then(|terms| terms.as_str())
}
