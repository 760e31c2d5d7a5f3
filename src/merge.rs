use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::clients::SearchIndex;
use crate::document::{FieldMapping, FieldValue};
use crate::error::{IndexerError, Result};

/// Run-wide setting controlling whether catalog-record merging is
/// attempted, mandatory, or suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Never merge; a present catalog key is ignored with a warning.
    Never,
    /// Merge when a catalog record exists, index standalone otherwise.
    #[default]
    Sometimes,
    /// Merge or fail the object; standalone indexing is forbidden.
    Always,
}

impl FromStr for MergePolicy {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "never" => Ok(MergePolicy::Never),
            "sometimes" => Ok(MergePolicy::Sometimes),
            "always" => Ok(MergePolicy::Always),
            other => Err(IndexerError::Config(format!(
                "unknown merge policy '{}' (expected never, sometimes, always)",
                other
            ))),
        }
    }
}

/// The catalog merge backend. `Ok(false)` is the documented "no catalog
/// record to merge with" outcome, never an error; callers branch on it.
#[async_trait]
pub trait CatalogMerger: Send + Sync {
    async fn merge_and_index(&self, catalog_key: &str, fields: &FieldMapping) -> Result<bool>;
}

/// Merges harvested fields into a pre-existing catalog record: looks the
/// record up in the catalog backend, injects every field, and submits the
/// mutated document straight to the index backend with its own commit.
pub struct SolrRecordMerger {
    catalog: Arc<dyn SearchIndex>,
    index: Arc<dyn SearchIndex>,
}

impl SolrRecordMerger {
    pub fn new(catalog: Arc<dyn SearchIndex>, index: Arc<dyn SearchIndex>) -> Self {
        Self { catalog, index }
    }
}

#[async_trait]
impl CatalogMerger for SolrRecordMerger {
    async fn merge_and_index(&self, catalog_key: &str, fields: &FieldMapping) -> Result<bool> {
        let Some(mut doc) = self.catalog.fetch_doc(catalog_key).await? else {
            debug!(catalog_key = %catalog_key, "no catalog record to merge with");
            return Ok(false);
        };

        let record = doc.as_object_mut().ok_or_else(|| IndexerError::Solr {
            message: format!("catalog record {} is not a JSON object", catalog_key),
        })?;
        for (field, value) in fields.iter() {
            // The record keeps its catalog id; everything else is injected.
            if field == "id" {
                continue;
            }
            inject(record, field, value);
        }

        self.index.add_raw(&doc).await?;
        self.index.commit().await?;
        info!(catalog_key = %catalog_key, "merged fields into catalog record");
        Ok(true)
    }
}

/// Add harvested values onto a catalog record: strings as single values,
/// lists one entry per member. An occupied slot is promoted to an array
/// and appended to rather than clobbered.
fn inject(record: &mut serde_json::Map<String, Value>, field: &str, value: &FieldValue) {
    let members: Vec<Value> = value
        .present_members()
        .into_iter()
        .map(|m| Value::String(m.to_string()))
        .collect();
    if members.is_empty() {
        return;
    }

    match record.get_mut(field) {
        None => {
            if members.len() == 1 {
                record.insert(field.to_string(), members.into_iter().next().unwrap());
            } else {
                record.insert(field.to_string(), Value::Array(members));
            }
        }
        Some(existing) => {
            let mut merged = match existing.take() {
                Value::Array(items) => items,
                single => vec![single],
            };
            for member in members {
                if !merged.contains(&member) {
                    merged.push(member);
                }
            }
            *existing = Value::Array(merged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory index double: documents by id, commit counter.
    struct FakeIndex {
        docs: Mutex<HashMap<String, Value>>,
        commits: Mutex<usize>,
    }

    impl FakeIndex {
        fn new() -> Self {
            Self {
                docs: Mutex::new(HashMap::new()),
                commits: Mutex::new(0),
            }
        }

        fn with_doc(self, id: &str, doc: Value) -> Self {
            self.docs.lock().unwrap().insert(id.to_string(), doc);
            self
        }
    }

    #[async_trait]
    impl SearchIndex for FakeIndex {
        async fn add(&self, doc: &FieldMapping) -> Result<()> {
            self.add_raw(&doc.to_solr_json()).await
        }

        async fn add_raw(&self, doc: &Value) -> Result<()> {
            let id = doc["id"].as_str().unwrap_or_default().to_string();
            self.docs.lock().unwrap().insert(id, doc.clone());
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            *self.commits.lock().unwrap() += 1;
            Ok(())
        }

        async fn query_count(&self, field: &str, value: &str) -> Result<u64> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .values()
                .filter(|d| match &d[field] {
                    Value::String(s) => s == value,
                    Value::Array(items) => items.iter().any(|i| i == value),
                    _ => false,
                })
                .count() as u64)
        }

        async fn fetch_doc(&self, id: &str) -> Result<Option<Value>> {
            Ok(self.docs.lock().unwrap().get(id).cloned())
        }
    }

    fn harvested_fields() -> FieldMapping {
        let mut fields = FieldMapping::new();
        fields.set("id", "aa111bb2222");
        fields.set("druid", "aa111bb2222");
        fields.set("file_id", vec!["f1", "f2"]);
        fields
    }

    #[tokio::test]
    async fn test_absent_record_returns_false_without_side_effects() {
        let catalog = Arc::new(FakeIndex::new());
        let index = Arc::new(FakeIndex::new());
        let merger = SolrRecordMerger::new(catalog, index.clone());

        let merged = merger.merge_and_index("666", &harvested_fields()).await.unwrap();
        assert!(!merged);
        assert!(index.docs.lock().unwrap().is_empty());
        assert_eq!(*index.commits.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_present_record_gets_fields_injected_and_committed() {
        let catalog =
            Arc::new(FakeIndex::new().with_doc("666", json!({"id": "666", "title": "Catalog title"})));
        let index = Arc::new(FakeIndex::new());
        let merger = SolrRecordMerger::new(catalog, index.clone());

        let merged = merger.merge_and_index("666", &harvested_fields()).await.unwrap();
        assert!(merged);
        assert_eq!(*index.commits.lock().unwrap(), 1);

        let docs = index.docs.lock().unwrap();
        let doc = docs.get("666").unwrap();
        assert_eq!(doc["title"], "Catalog title");
        assert_eq!(doc["id"], "666");
        assert_eq!(doc["druid"], "aa111bb2222");
        assert_eq!(doc["file_id"], json!(["f1", "f2"]));
    }

    #[tokio::test]
    async fn test_injection_appends_to_occupied_slots() {
        let catalog = Arc::new(
            FakeIndex::new().with_doc("666", json!({"id": "666", "file_id": "existing.jp2"})),
        );
        let index = Arc::new(FakeIndex::new());
        let merger = SolrRecordMerger::new(catalog, index.clone());

        merger.merge_and_index("666", &harvested_fields()).await.unwrap();
        let docs = index.docs.lock().unwrap();
        assert_eq!(docs.get("666").unwrap()["file_id"], json!(["existing.jp2", "f1", "f2"]));
    }

    #[test]
    fn test_merge_policy_parsing() {
        assert_eq!("never".parse::<MergePolicy>().unwrap(), MergePolicy::Never);
        assert_eq!("sometimes".parse::<MergePolicy>().unwrap(), MergePolicy::Sometimes);
        assert_eq!("always".parse::<MergePolicy>().unwrap(), MergePolicy::Always);
        assert!("occasionally".parse::<MergePolicy>().is_err());
    }
}
