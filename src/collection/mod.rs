use crate::engine::{ensure_success, http_error};
use crate::error::{LoaderError, Result};
use crate::schema::IndexSchema;
use crate::types::CollectionName;
use reqwest::{Client, StatusCode};

/// How many times `recreate` tries the PUT before giving up
pub const MAX_RECREATE_ATTEMPTS: usize = 3;

/// Creates and removes collections on the search service
#[derive(Clone)]
pub struct CollectionManager {
    client: Client,
    base_url: String,
}

impl CollectionManager {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, name: &CollectionName) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Create a collection with the given schema; fails if it already exists
    pub async fn create(&self, name: &CollectionName, schema: &IndexSchema) -> Result<()> {
        let response = self
            .client
            .put(self.url(name))
            .json(schema.as_json())
            .send()
            .await?;
        ensure_success(response).await?;

        tracing::info!("Created collection: {}", name);
        Ok(())
    }

    /// Drop a collection. Returns `false` when there was nothing to drop.
    pub async fn delete(&self, name: &CollectionName) -> Result<bool> {
        let response = self.client.delete(self.url(name)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Collection '{}' not found, nothing to drop", name);
            return Ok(false);
        }
        ensure_success(response).await?;

        tracing::info!("Dropped collection: {}", name);
        Ok(true)
    }

    pub async fn exists(&self, name: &CollectionName) -> Result<bool> {
        let response = self.client.head(self.url(name)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(http_error(response).await),
        }
    }

    /// Create the collection, dropping a previous one of the same name first.
    ///
    /// A 400 whose error type is `resource_already_exists_exception` leads to
    /// a delete and another creation attempt. Any other failure, including a
    /// 400 for a rejected schema, is returned as is.
    pub async fn recreate(&self, name: &CollectionName, schema: &IndexSchema) -> Result<()> {
        for attempt in 1..=MAX_RECREATE_ATTEMPTS {
            let response = self
                .client
                .put(self.url(name))
                .json(schema.as_json())
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                tracing::info!("Created collection: {} (attempt {})", name, attempt);
                return Ok(());
            }

            if status != StatusCode::BAD_REQUEST {
                return Err(http_error(response).await);
            }

            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            if !is_already_exists(&body) {
                return Err(LoaderError::HttpError {
                    status: status.as_u16(),
                    url,
                    body,
                });
            }
            if attempt == MAX_RECREATE_ATTEMPTS {
                break;
            }

            tracing::warn!("Collection '{}' already exists, dropping it", name);
            self.delete(name).await?;
        }

        Err(LoaderError::RecreateExhausted {
            name: name.to_string(),
            attempts: MAX_RECREATE_ATTEMPTS,
        })
    }
}

/// Whether a 400 body is the service's "index already exists" error
fn is_already_exists(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/type")
                .and_then(|kind| kind.as_str())
                .map(|kind| kind == "resource_already_exists_exception")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"error":{"type":"resource_already_exists_exception"},"status":400}"#, true)]
    #[case(r#"{"error":{"type":"mapper_parsing_exception"},"status":400}"#, false)]
    #[case(r#"{"error":"plain string"}"#, false)]
    #[case("mapper_parsing_exception: bad mapping", false)]
    #[case("", false)]
    fn test_is_already_exists(#[case] body: &str, #[case] expected: bool) {
        assert_eq!(is_already_exists(body), expected);
    }
}
