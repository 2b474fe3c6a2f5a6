//! Bulk batch builder: pairs of index action and document lines, flushed in fixed-size batches.

use crate::engine::ensure_success;
use crate::error::Result;
use crate::schema::BulkDocument;
use crate::source::RecordSource;
use crate::types::{BulkReport, BulkResponse, CollectionName};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

/// Records per `_bulk` request
pub const BULK_BATCH_SIZE: usize = 2500;

#[derive(Serialize)]
struct IndexAction<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: u64,
}

/// Accumulated action/document line pairs for one request
#[derive(Debug, Clone)]
pub struct BulkBatch {
    lines: Vec<String>,
    capacity: usize,
}

impl BulkBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Vec::with_capacity(capacity * 2),
            capacity,
        }
    }

    /// Append the index action for `doc` followed by its body
    pub fn push<D: BulkDocument>(&mut self, collection: &CollectionName, doc: &D) -> Result<()> {
        let action = IndexAction {
            index: ActionMeta {
                index: collection.as_str(),
                id: doc.doc_id(),
            },
        };
        let action = serde_json::to_string(&action)?;
        let body = serde_json::to_string(doc)?;

        self.lines.push(action);
        self.lines.push(body);
        Ok(())
    }

    /// Number of (action, document) pairs
    pub fn len(&self) -> usize {
        self.lines.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-joined lines plus the terminating empty line
    pub fn payload(&self) -> String {
        let mut body = self.lines.join("\n");
        body.push('\n');
        body
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Streams a record source into a collection through `PUT <base>/<collection>/_bulk`
pub struct BulkLoader {
    client: Client,
    base_url: String,
}

impl BulkLoader {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Index every record of `source` exactly once, in order.
    ///
    /// The first failing request aborts the load; batches already sent stay
    /// in the collection, so a retry has to rebuild it from scratch.
    pub async fn load<S: RecordSource>(
        &self,
        collection: &CollectionName,
        source: S,
    ) -> Result<BulkReport> {
        let total = source.total();
        let mut batch = BulkBatch::with_capacity(BULK_BATCH_SIZE);
        let mut report = BulkReport::default();

        tracing::info!("Loading {} records into '{}'", total, collection);

        for record in source {
            let record = record?;
            batch.push(collection, &record)?;
            report.records += 1;

            if batch.is_full() {
                self.flush(collection, &mut batch, &mut report, total)
                    .await?;
            }
        }

        if !batch.is_empty() {
            self.flush(collection, &mut batch, &mut report, total)
                .await?;
        }

        if report.item_errors > 0 {
            tracing::warn!(
                "{} documents were rejected by '{}'",
                report.item_errors,
                collection
            );
        }

        Ok(report)
    }

    async fn flush(
        &self,
        collection: &CollectionName,
        batch: &mut BulkBatch,
        report: &mut BulkReport,
        total: usize,
    ) -> Result<()> {
        let url = format!("{}/{}/_bulk", self.base_url, collection);
        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(batch.payload())
            .send()
            .await?;
        let response = ensure_success(response).await?;

        report.requests += 1;
        let sent = batch.len();
        batch.clear();

        let text = response.text().await?;
        if let Ok(body) = serde_json::from_str::<BulkResponse>(&text) {
            if body.errors {
                let failed = body.failed_items();
                tracing::warn!("Bulk request {} had {} failed items", report.requests, failed);
                report.item_errors += failed;
            }
        }

        let fraction = if total > 0 {
            report.records as f64 / total as f64
        } else {
            1.0
        };
        tracing::info!(
            "Data inserted {}/{} ({:.2})",
            report.records,
            total,
            fraction
        );
        tracing::debug!("Flushed {} documents to {}", sent, url);

        Ok(())
    }
}
