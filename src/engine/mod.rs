use crate::bulk::BulkLoader;
use crate::collection::CollectionManager;
use crate::error::{LoaderError, Result};
use crate::schema::IndexSchema;
use crate::search::SearchClient;
use crate::source::{CatalogSource, SyntheticQuerySource};
use crate::types::{BulkReport, CollectionName, LoaderConfig};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, Url};
use std::path::Path;

/// Turn a non-success response into `LoaderError::HttpError`, keeping the body
pub async fn http_error(response: Response) -> LoaderError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    LoaderError::HttpError { status, url, body }
}

/// Pass successful responses through, fail on anything else
pub async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(http_error(response).await)
    }
}

/// Handle on one search service: collection management, bulk loading and queries
pub struct SearchService {
    config: LoaderConfig,
    client: Client,
}

impl SearchService {
    /// Create a new service handle with the given configuration
    pub fn new(config: LoaderConfig) -> Result<Self> {
        Url::parse(&config.service.base_url).map_err(|e| {
            LoaderError::ConfigError(format!(
                "Invalid service URL '{}': {}",
                config.service.base_url, e
            ))
        })?;

        let client = Client::builder().build()?;

        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        self.config.service.base_url.trim_end_matches('/')
    }

    pub fn collections(&self) -> CollectionManager {
        CollectionManager::new(self.client.clone(), self.base_url())
    }

    pub fn loader(&self) -> BulkLoader {
        BulkLoader::new(self.client.clone(), self.base_url())
    }

    pub fn search_client(&self) -> SearchClient {
        SearchClient::new(self.client.clone(), self.base_url(), &self.config.retry)
    }

    /// Rebuild `collection` from the cleaned catalog at `path`
    pub async fn load_catalog<P: AsRef<Path>>(
        &self,
        collection: &CollectionName,
        schema: &IndexSchema,
        path: P,
    ) -> Result<BulkReport> {
        let source = CatalogSource::open(path)?;
        self.collections().recreate(collection, schema).await?;
        let report = self.loader().load(collection, source).await?;

        tracing::info!(
            "Loaded {} products into '{}' with {} requests",
            report.records,
            collection,
            report.requests
        );
        Ok(report)
    }

    /// Rebuild `collection` from `count` synthetic search-log entries
    pub async fn load_queries(
        &self,
        collection: &CollectionName,
        schema: &IndexSchema,
        count: usize,
        seed: u64,
        now: DateTime<Utc>,
    ) -> Result<BulkReport> {
        self.collections().recreate(collection, schema).await?;
        tracing::info!("Inserting fake queries");
        let source = SyntheticQuerySource::new(count, seed, now);
        let report = self.loader().load(collection, source).await?;

        tracing::info!(
            "Loaded {} queries into '{}' with {} requests",
            report.records,
            collection,
            report.requests
        );
        Ok(report)
    }

    /// Get service configuration
    pub fn get_config(&self) -> &LoaderConfig {
        &self.config
    }
}
