use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::clients::MetadataSource;
use crate::constants::COLLECTION_TITLE_SEP;
use crate::error::Result;
use crate::extract::DisplayType;
use crate::resource::Resource;

/// What a member item needs to know about one of its collections.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub druid: String,
    pub catalog_key: Option<String>,
    pub title: String,
}

impl CollectionInfo {
    /// The identifier items carry in their collection field: the catalog
    /// key when the collection is catalog-backed, its druid otherwise.
    pub fn index_id(&self) -> &str {
        self.catalog_key.as_deref().unwrap_or(&self.druid)
    }

    /// The "id-|-title" composite carried alongside the plain id.
    pub fn with_title(&self) -> String {
        format!("{}{}{}", self.index_id(), COLLECTION_TITLE_SEP, self.title)
    }
}

struct CollectionEntry {
    info: CollectionInfo,
    display_types: BTreeSet<DisplayType>,
}

/// Per-run cache of collection facts, owned by the orchestrator and shared
/// by reference with every indexing flow. Collection title and catalog key
/// are looked up once; member items contribute their display types here so
/// the collection record (indexed after the fan-out drains) can carry the
/// aggregate.
pub struct CollectionContext {
    source: Arc<dyn MetadataSource>,
    entries: Mutex<HashMap<String, CollectionEntry>>,
}

impl CollectionContext {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Collection info, fetched on first request and cached for the run.
    pub async fn info(&self, collection_druid: &str) -> Result<CollectionInfo> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(collection_druid) {
            return Ok(entry.info.clone());
        }

        let resource = Resource::new(collection_druid, self.source.clone());
        let catalog_key = resource.catalog_key().await?;
        let title = match resource.label().await? {
            Some(label) => label,
            None => collection_druid.to_string(),
        };
        debug!(collection = %collection_druid, title = %title, "cached collection info");

        let info = CollectionInfo {
            druid: collection_druid.to_string(),
            catalog_key,
            title,
        };
        entries.insert(
            collection_druid.to_string(),
            CollectionEntry {
                info: info.clone(),
                display_types: BTreeSet::new(),
            },
        );
        Ok(info)
    }

    /// Record a member item's display type against its collection.
    pub async fn record_display_type(&self, collection_druid: &str, display_type: DisplayType) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(collection_druid) {
            entry.display_types.insert(display_type);
        }
    }

    /// Distinct display types contributed by the collection's items so far.
    pub async fn display_types(&self, collection_druid: &str) -> Vec<String> {
        let entries = self.entries.lock().await;
        entries
            .get(collection_druid)
            .map(|entry| {
                entry
                    .display_types
                    .iter()
                    .map(|dt| dt.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}
