use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::document::FieldMapping;
use crate::error::{IndexerError, Result};

/// Core trait for the search index documents are written to.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Add or update one document (visible after the next commit).
    async fn add(&self, doc: &FieldMapping) -> Result<()>;

    /// Add or update a raw document, bypassing the field-mapping path.
    /// The catalog merge adapter submits mutated catalog records this way.
    async fn add_raw(&self, doc: &Value) -> Result<()>;

    /// Make pending additions visible to queries.
    async fn commit(&self) -> Result<()>;

    /// Number of documents matching `field:value`.
    async fn query_count(&self, field: &str, value: &str) -> Result<u64>;

    /// Fetch one document by its id field, if present.
    async fn fetch_doc(&self, id: &str) -> Result<Option<Value>>;
}

/// HTTP client speaking the Solr JSON update and select APIs.
pub struct SolrClient {
    base_url: String,
    client: reqwest::Client,
}

impl SolrClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_update(&self, body: Value) -> Result<()> {
        let url = format!("{}/update", self.base_url);
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(IndexerError::Solr {
                message: format!("update returned HTTP {}", resp.status().as_u16()),
            });
        }
        Ok(())
    }

    async fn select(&self, query: &str, rows: u32) -> Result<Value> {
        let url = format!("{}/select", self.base_url);
        let rows = rows.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("q", query), ("rows", rows.as_str()), ("wt", "json")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(IndexerError::Solr {
                message: format!("select returned HTTP {}", resp.status().as_u16()),
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl SearchIndex for SolrClient {
    async fn add(&self, doc: &FieldMapping) -> Result<()> {
        debug!(fields = doc.len(), "adding document to solr");
        self.post_update(json!([doc.to_solr_json()])).await
    }

    async fn add_raw(&self, doc: &Value) -> Result<()> {
        self.post_update(json!([doc])).await
    }

    async fn commit(&self) -> Result<()> {
        self.post_update(json!({ "commit": {} })).await
    }

    async fn query_count(&self, field: &str, value: &str) -> Result<u64> {
        let body = self.select(&format!("{}:\"{}\"", field, value), 0).await?;
        body["response"]["numFound"]
            .as_u64()
            .ok_or_else(|| IndexerError::Solr {
                message: "select response had no numFound".to_string(),
            })
    }

    async fn fetch_doc(&self, id: &str) -> Result<Option<Value>> {
        let body = self.select(&format!("id:\"{}\"", id), 1).await?;
        Ok(body["response"]["docs"]
            .as_array()
            .and_then(|docs| docs.first())
            .cloned())
    }
}
