//! # Catalog Loader
//!
//! Prepares a product catalog for a search service and loads it there:
//! - Strips `<code>-` prefixes from catalog fields (CSV in, CSV out)
//! - Maps cleaned rows onto a fixed product record
//! - Ships records through the `_bulk` endpoint in batches of 2500
//! - (Re)creates collections from an explicit schema document
//! - Runs query documents against a collection, retrying transient failures

pub mod bulk;
pub mod collection;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod schema;
pub mod search;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use bulk::{BULK_BATCH_SIZE, BulkBatch, BulkLoader};
pub use collection::{CollectionManager, MAX_RECREATE_ATTEMPTS};
pub use engine::SearchService;
pub use error::{LoaderError, Result};
pub use normalize::{normalize_file, normalize_reader, normalize_record, strip_code};
pub use schema::{BulkDocument, IndexSchema, ProductField, ProductRecord, QueryRecord};
pub use search::{SearchClient, render_hits};
pub use source::{CatalogSource, RecordSource, SyntheticQuerySource};
pub use types::{
    BulkReport, CollectionName, LoaderConfig, RetryConfig, SearchHit, SearchResponse,
    ServiceConfig,
};

/// Config file used when `APP_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "app.toml";

/// Read and parse a TOML file
pub fn load_toml_config<T: serde::de::DeserializeOwned, P: AsRef<std::path::Path>>(
    path: P,
) -> Result<T> {
    let path = path.as_ref();
    tracing::info!("Loading config from: {}", path.display());

    let raw_config = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
    tracing::debug!("Raw config: {}", raw_config);

    toml::from_str(&raw_config).map_err(|e| {
        LoaderError::ConfigError(format!("Failed to parse config '{}': {}", path.display(), e))
    })
}

/// Load the loader configuration, falling back to defaults when the file is absent
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<LoaderConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(LoaderConfig::default());
    }
    load_toml_config(path)
}

/// Convenience function to create a service handle with default configuration
pub fn create_service() -> Result<SearchService> {
    SearchService::new(LoaderConfig::default())
}

/// Convenience function to create a service handle for a given base URL
pub fn create_service_at(base_url: &str) -> Result<SearchService> {
    SearchService::new(LoaderConfigBuilder::new().base_url(base_url).build())
}

/// Builder pattern for creating loader configurations
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.config.service.base_url = base_url.to_string();
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn backoff_factor_ms(mut self, backoff_factor_ms: u64) -> Self {
        self.config.retry.backoff_factor_ms = backoff_factor_ms;
        self
    }

    pub fn max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.config.retry.max_delay_ms = max_delay_ms;
        self
    }

    pub fn build(self) -> LoaderConfig {
        self.config
    }
}

impl Default for LoaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in schema documents, used when no schema file is given
pub mod schema_helpers {
    use super::schema::{IndexSchema, ProductField};
    use serde_json::{Map, Value, json};
    use strum::IntoEnumIterator;

    /// Product catalog: every attribute is full text with a keyword subfield
    pub fn product_catalog_schema() -> IndexSchema {
        let mut properties = Map::new();
        properties.insert("id".to_string(), json!({"type": "long"}));

        for field in ProductField::iter() {
            properties.insert(
                field.to_string(),
                json!({
                    "type": "text",
                    "fields": {"keyword": {"type": "keyword", "ignore_above": 256}}
                }),
            );
        }

        IndexSchema::new(json!({
            "settings": {"number_of_shards": 1, "number_of_replicas": 0},
            "mappings": {"properties": Value::Object(properties)}
        }))
    }

    /// Search log: epoch-millis timestamp plus the query terms
    pub fn query_log_schema() -> IndexSchema {
        IndexSchema::new(json!({
            "settings": {"number_of_shards": 1, "number_of_replicas": 0},
            "mappings": {
                "properties": {
                    "id": {"type": "long"},
                    "timestamp": {"type": "date", "format": "epoch_millis"},
                    "terms": {"type": "keyword"}
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_service_creation() {
        let service = create_service_at("http://127.0.0.1:9200").unwrap();
        assert_eq!(service.base_url(), "http://127.0.0.1:9200");
        assert_eq!(service.get_config().retry.max_retries, 5);
    }

    #[test]
    fn test_schema_helpers() {
        let schema = schema_helpers::product_catalog_schema();
        let properties = &schema.as_json()["mappings"]["properties"];
        assert_eq!(properties["description"]["type"], "text");
        assert_eq!(properties["internet_description"]["type"], "text");
        assert_eq!(properties["id"]["type"], "long");

        let schema = schema_helpers::query_log_schema();
        assert_eq!(
            schema.as_json()["mappings"]["properties"]["timestamp"]["format"],
            "epoch_millis"
        );
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.service.base_url, "http://localhost:9200");
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn test_load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nbase_url = \"http://es01:9200\"\n[retry]\nmax_retries = 2").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.service.base_url, "http://es01:9200");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.backoff_factor_ms, 100);
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service\nbase_url = 1").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(LoaderError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = LoaderConfigBuilder::new()
            .base_url("http://es01:9200")
            .max_retries(2)
            .backoff_factor_ms(10)
            .max_delay_ms(50)
            .build();

        assert_eq!(config.service.base_url, "http://es01:9200");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.backoff_factor_ms, 10);
        assert_eq!(config.retry.max_delay_ms, 50);
    }
}
