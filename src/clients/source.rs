use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{IndexerError, Result};

/// Core trait for the repository service this pipeline harvests from.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Raw MODS descriptive metadata for one object.
    async fn mods(&self, druid: &str) -> Result<String>;

    /// Raw public XML manifest for one object.
    async fn public_xml(&self, druid: &str) -> Result<String>;

    /// Druids of all member objects of a collection.
    async fn member_druids(&self, collection_druid: &str) -> Result<Vec<String>>;
}

/// HTTP client against the purl service. Server errors get a bounded
/// sleep-and-retry before escalating; everything else fails immediately.
pub struct PurlClient {
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
    retry_sleep: Duration,
}

impl PurlClient {
    pub fn new(base_url: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            max_retries,
            retry_sleep: Duration::from_secs(2),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            let response = self.client.get(url).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    debug!(url = %url, "fetched");
                    return Ok(resp.text().await?);
                }
                Ok(resp) if resp.status().is_server_error() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        url = %url,
                        status = resp.status().as_u16(),
                        attempt,
                        "server error from metadata source, retrying"
                    );
                    tokio::time::sleep(self.retry_sleep).await;
                }
                Ok(resp) => {
                    return Err(IndexerError::Source {
                        message: format!("{} returned HTTP {}", url, resp.status().as_u16()),
                    });
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(url = %url, error = %e, attempt, "transport error, retrying");
                    tokio::time::sleep(self.retry_sleep).await;
                }
                Err(e) => return Err(IndexerError::Http(e)),
            }
        }
    }
}

#[async_trait]
impl MetadataSource for PurlClient {
    async fn mods(&self, druid: &str) -> Result<String> {
        self.fetch_text(&format!("{}/{}.mods", self.base_url, druid))
            .await
    }

    async fn public_xml(&self, druid: &str) -> Result<String> {
        self.fetch_text(&format!("{}/{}.xml", self.base_url, druid))
            .await
    }

    async fn member_druids(&self, collection_druid: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}.members.json", self.base_url, collection_druid);
        let body = self.fetch_text(&url).await?;
        let members: Vec<String> = serde_json::from_str(&body)?;
        Ok(members
            .into_iter()
            .map(|m| m.trim_start_matches("druid:").to_string())
            .filter(|m| !m.is_empty())
            .collect())
    }
}
