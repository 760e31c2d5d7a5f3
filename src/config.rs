use std::fs;
use std::path::Path;

use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::error::{IndexerError, Result};
use crate::extract::DateBounds;
use crate::merge::MergePolicy;

/// Full configuration surface for one collection harvest, loaded from a
/// TOML file named on the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    pub harvest: HarvestConfig,
    pub purl: PurlConfig,
    pub solr: SolrConfig,
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Druid of the collection to harvest.
    pub collection: String,
    /// Explicit druid allow-list; bypasses the full member harvest.
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Fixed worker count for the indexing fan-out.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurlConfig {
    pub url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolrConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateConfig {
    /// Years below this are treated as extraction noise.
    #[serde(default = "default_min_pub_year")]
    pub min_pub_year: i32,
    /// Years above this are treated as extraction noise.
    #[serde(default = "default_max_pub_year")]
    pub max_pub_year: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            min_pub_year: default_min_pub_year(),
            max_pub_year: default_max_pub_year(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// Recipient for the end-of-run email; no email is sent when unset.
    pub email: Option<String>,
    #[serde(default = "default_notify_from")]
    pub from: String,
    /// Hostname fragments that mark a production host. Notifications only
    /// go out when the current hostname matches one of these.
    #[serde(default)]
    pub production_hosts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_name")]
    pub name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            name: default_log_name(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_fetch_retries() -> u32 {
    3
}

fn default_min_pub_year() -> i32 {
    -1000
}

fn default_max_pub_year() -> i32 {
    Utc::now().year() + 1
}

fn default_notify_from() -> String {
    "harvest-indexer@localhost".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_name() -> String {
    "indexer.log".to_string()
}

impl IndexerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IndexerError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: IndexerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.harvest.collection.trim().is_empty() {
            return Err(IndexerError::Config(
                "harvest.collection must name a collection druid".to_string(),
            ));
        }
        if self.harvest.workers == 0 {
            return Err(IndexerError::Config(
                "harvest.workers must be at least 1".to_string(),
            ));
        }
        if self.purl.url.trim().is_empty() || self.solr.url.trim().is_empty() {
            return Err(IndexerError::Config(
                "purl.url and solr.url are required".to_string(),
            ));
        }
        if self.dates.min_pub_year > self.dates.max_pub_year {
            return Err(IndexerError::Config(
                "dates.min_pub_year exceeds dates.max_pub_year".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bounds(&self) -> DateBounds {
        DateBounds {
            min_year: self.dates.min_pub_year,
            max_year: self.dates.max_pub_year,
        }
    }

    /// True when this process runs on a recognized production host.
    pub fn on_production_host(&self) -> bool {
        if self.notify.production_hosts.is_empty() {
            return false;
        }
        let hostname = std::env::var("HOSTNAME").unwrap_or_default();
        self.notify
            .production_hosts
            .iter()
            .any(|fragment| !fragment.is_empty() && hostname.contains(fragment))
    }
}
