use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use harvest_indexer::clients::{MetadataSource, Notifier, SearchIndex};
use harvest_indexer::config::IndexerConfig;
use harvest_indexer::document::FieldMapping;
use harvest_indexer::error::Result as IndexerResult;
use harvest_indexer::harvest::Harvester;
use harvest_indexer::merge::{CatalogMerger, MergePolicy, SolrRecordMerger};

// ---------------------------------------------------------------------------
// In-memory fakes for the external collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSource {
    /// druid -> (mods xml, public xml)
    objects: HashMap<String, (String, String)>,
    members: Vec<String>,
    /// druids whose fetches blow up, to exercise failure isolation
    broken: HashSet<String>,
}

impl FakeSource {
    fn add_object(&mut self, druid: &str, mods: String, public: String) {
        self.objects.insert(druid.to_string(), (mods, public));
    }
}

#[async_trait]
impl MetadataSource for FakeSource {
    async fn mods(&self, druid: &str) -> IndexerResult<String> {
        if self.broken.contains(druid) {
            return Err(harvest_indexer::error::IndexerError::Source {
                message: format!("simulated outage fetching {}", druid),
            });
        }
        self.objects
            .get(druid)
            .map(|(mods, _)| mods.clone())
            .ok_or_else(|| harvest_indexer::error::IndexerError::Source {
                message: format!("unknown druid {}", druid),
            })
    }

    async fn public_xml(&self, druid: &str) -> IndexerResult<String> {
        if self.broken.contains(druid) {
            return Err(harvest_indexer::error::IndexerError::Source {
                message: format!("simulated outage fetching {}", druid),
            });
        }
        self.objects
            .get(druid)
            .map(|(_, public)| public.clone())
            .ok_or_else(|| harvest_indexer::error::IndexerError::Source {
                message: format!("unknown druid {}", druid),
            })
    }

    async fn member_druids(&self, _collection_druid: &str) -> IndexerResult<Vec<String>> {
        Ok(self.members.clone())
    }
}

#[derive(Default)]
struct FakeIndex {
    docs: Mutex<HashMap<String, Value>>,
    commits: Mutex<usize>,
}

impl FakeIndex {
    fn doc(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    fn doc_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap()
    }

    fn seed(&self, id: &str, doc: Value) {
        self.docs.lock().unwrap().insert(id.to_string(), doc);
    }
}

#[async_trait]
impl SearchIndex for FakeIndex {
    async fn add(&self, doc: &FieldMapping) -> IndexerResult<()> {
        self.add_raw(&doc.to_solr_json()).await
    }

    async fn add_raw(&self, doc: &Value) -> IndexerResult<()> {
        let id = doc["id"].as_str().unwrap_or_default().to_string();
        self.docs.lock().unwrap().insert(id, doc.clone());
        Ok(())
    }

    async fn commit(&self) -> IndexerResult<()> {
        *self.commits.lock().unwrap() += 1;
        Ok(())
    }

    async fn query_count(&self, field: &str, value: &str) -> IndexerResult<u64> {
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

    async fn fetch_doc(&self, id: &str) -> IndexerResult<Option<Value>> {
        Ok(self.doc(id))
    }
}

struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn notify(&self, _subject: &str, _body: &str) -> IndexerResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// XML fixtures
// ---------------------------------------------------------------------------

const COLLECTION: &str = "cc111dd2222";

fn mods_xml(title: &str) -> String {
    format!(
        r#"<mods xmlns="http://www.loc.gov/mods/v3">
             <titleInfo><title>{}</title></titleInfo>
             <name type="personal"><namePart>Doe, Jane</namePart></name>
             <typeOfResource>still image</typeOfResource>
             <originInfo><dateIssued>1886</dateIssued></originInfo>
           </mods>"#,
        title
    )
}

fn item_public_xml(druid: &str, content_type: &str, catkey: Option<&str>) -> String {
    let catkey_el = catkey
        .map(|k| format!(r#"<otherId name="catkey">{}</otherId>"#, k))
        .unwrap_or_default();
    format!(
        r#"<publicObject id="druid:{druid}">
             <identityMetadata>
               <objectType>item</objectType>
               {catkey_el}
             </identityMetadata>
             <contentMetadata type="{content_type}">
               <resource type="{res_type}"><file id="{druid}_1"/></resource>
             </contentMetadata>
             <RDF><Description>
               <isMemberOfCollection resource="info:fedora/druid:{collection}"/>
             </Description></RDF>
           </publicObject>"#,
        druid = druid,
        catkey_el = catkey_el,
        content_type = content_type,
        res_type = if content_type == "image" { "image" } else { "file" },
        collection = COLLECTION,
    )
}

fn collection_public_xml(catkey: Option<&str>) -> String {
    let catkey_el = catkey
        .map(|k| format!(r#"<otherId name="catkey">{}</otherId>"#, k))
        .unwrap_or_default();
    format!(
        r#"<publicObject id="druid:{COLLECTION}">
             <identityMetadata>
               <objectType>collection</objectType>
               <objectLabel>Test Collection</objectLabel>
               {catkey_el}
             </identityMetadata>
           </publicObject>"#
    )
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn config(merge_policy: MergePolicy, whitelist: &[&str]) -> IndexerConfig {
    let policy = match merge_policy {
        MergePolicy::Never => "never",
        MergePolicy::Sometimes => "sometimes",
        MergePolicy::Always => "always",
    };
    let whitelist_toml = if whitelist.is_empty() {
        String::new()
    } else {
        format!(
            "whitelist = [{}]",
            whitelist
                .iter()
                .map(|d| format!("\"{}\"", d))
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    toml::from_str(&format!(
        r#"
            [harvest]
            collection = "{COLLECTION}"
            workers = 2
            merge_policy = "{policy}"
            {whitelist_toml}

            [purl]
            url = "https://purl.example.org"

            [solr]
            url = "http://localhost:8983/solr/core"
        "#
    ))
    .unwrap()
}

struct Pipeline {
    harvester: Harvester,
    index: Arc<FakeIndex>,
    catalog: Arc<FakeIndex>,
}

fn pipeline(source: FakeSource, merge_policy: MergePolicy, whitelist: &[&str]) -> Pipeline {
    let index = Arc::new(FakeIndex::default());
    let catalog = Arc::new(FakeIndex::default());
    let merger: Arc<dyn CatalogMerger> =
        Arc::new(SolrRecordMerger::new(catalog.clone(), index.clone()));
    let harvester = Harvester {
        config: config(merge_policy, whitelist),
        source: Arc::new(source),
        index: index.clone(),
        merger: Some(merger),
        notifier: Arc::new(SilentNotifier),
        send_notification: false,
        hooks: Vec::new(),
    };
    Pipeline {
        harvester,
        index,
        catalog,
    }
}

fn two_item_source() -> FakeSource {
    let mut source = FakeSource::default();
    source.members = vec!["aa111bb0001".to_string(), "aa111bb0002".to_string()];
    source.add_object(
        "aa111bb0001",
        mods_xml("First item"),
        item_public_xml("aa111bb0001", "image", None),
    );
    source.add_object(
        "aa111bb0002",
        mods_xml("Second item"),
        item_public_xml("aa111bb0002", "file", None),
    );
    source.add_object(COLLECTION, mods_xml("Test Collection"), collection_public_xml(None));
    source
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_harvest_indexes_members_then_collection() -> Result<()> {
    let p = pipeline(two_item_source(), MergePolicy::Sometimes, &[]);

    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.discovered, 3);
    assert_eq!(outcome.stats.indexed, 3);
    assert_eq!(outcome.stats.errored, 0);
    assert_eq!(p.index.doc_count(), 3);
    assert_eq!(p.index.commit_count(), 1);

    let item = p.index.doc("aa111bb0001").unwrap();
    assert_eq!(item["druid"], "aa111bb0001");
    assert_eq!(item["display_type"], "image");
    assert_eq!(item["access_facet"], "Online");
    assert_eq!(item["url_fulltext"], "https://purl.example.org/aa111bb0001");
    assert_eq!(item["collection"], json!([COLLECTION]));
    assert_eq!(
        item["collection_with_title"],
        json!([format!("{}-|-Test Collection", COLLECTION)])
    );
    assert_eq!(item["file_id"], json!(["aa111bb0001_1"]));
    assert_eq!(item["title_display"], "First item");

    // success count matches the index-verified count, so no mismatch line
    assert!(outcome.summary.contains("Indexed: 3"));
    assert!(outcome.summary.contains("Index-verified: 3"));
    assert!(!outcome.summary.contains("WARNING"));
    Ok(())
}

#[tokio::test]
async fn test_collection_record_aggregates_member_display_types() -> Result<()> {
    let p = pipeline(two_item_source(), MergePolicy::Sometimes, &[]);
    p.harvester.run(false).await?;

    let collection = p.index.doc(COLLECTION).unwrap();
    assert_eq!(collection["display_type"], "collection");
    assert_eq!(collection["collection_type"], "Digital Collection");
    // one image item and one file item, no duplicates, whatever the
    // indexing order was
    assert_eq!(collection["item_display_type"], json!(["image", "file"]));
    let formats = collection["format_main_ssim"].as_array().unwrap();
    assert!(formats.contains(&json!("Archive/Manuscript")));
    Ok(())
}

#[tokio::test]
async fn test_one_broken_object_does_not_abort_the_run() -> Result<()> {
    let mut source = two_item_source();
    source.members.push("aa111bb0003".to_string());
    source.add_object(
        "aa111bb0003",
        mods_xml("Third item"),
        item_public_xml("aa111bb0003", "image", None),
    );
    source.broken.insert("aa111bb0002".to_string());

    let p = pipeline(source, MergePolicy::Sometimes, &[]);
    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.indexed, 3); // two good items + collection record
    assert_eq!(outcome.stats.errored, 1);
    assert_eq!(outcome.stats.failed_druids, vec!["aa111bb0002".to_string()]);
    assert!(p.index.doc("aa111bb0002").is_none());
    assert!(p.index.doc("aa111bb0003").is_some());
    assert!(outcome.summary.contains("Failed druids: aa111bb0002"));
    Ok(())
}

#[tokio::test]
async fn test_merge_policy_always_errors_when_catalog_record_missing() -> Result<()> {
    let mut source = FakeSource::default();
    source.members = vec!["aa111bb0001".to_string()];
    source.add_object(
        "aa111bb0001",
        mods_xml("Catalog-backed item"),
        item_public_xml("aa111bb0001", "image", Some("666")),
    );
    source.add_object(
        COLLECTION,
        mods_xml("Test Collection"),
        collection_public_xml(Some("777")),
    );

    let p = pipeline(source, MergePolicy::Always, &[]);
    // the collection itself can merge, so only the item is in question
    p.catalog.seed("777", json!({"id": "777", "title": "Catalog collection"}));

    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.errored, 1);
    assert_eq!(outcome.stats.failed_druids, vec!["aa111bb0001".to_string()]);
    // standalone path was forbidden: nothing landed under the item's druid
    assert!(p.index.doc("aa111bb0001").is_none());
    // the collection merged into its catalog record
    assert_eq!(outcome.stats.indexed, 1);
    assert!(p.index.doc("777").is_some());
    Ok(())
}

#[tokio::test]
async fn test_merge_policy_never_indexes_standalone_despite_catalog_key() -> Result<()> {
    let mut source = FakeSource::default();
    source.members = vec!["aa111bb0001".to_string()];
    source.add_object(
        "aa111bb0001",
        mods_xml("Catalog-backed item"),
        item_public_xml("aa111bb0001", "image", Some("666")),
    );
    source.add_object(COLLECTION, mods_xml("Test Collection"), collection_public_xml(None));

    let p = pipeline(source, MergePolicy::Never, &[]);
    // even a present catalog record must be ignored
    p.catalog.seed("666", json!({"id": "666", "title": "Catalog item"}));

    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.errored, 0);
    assert_eq!(outcome.stats.indexed, 2);
    let item = p.index.doc("aa111bb0001").unwrap();
    assert_eq!(item["druid"], "aa111bb0001");
    // the catalog record was left untouched
    assert_eq!(p.index.doc("666"), None);
    Ok(())
}

#[tokio::test]
async fn test_merge_policy_sometimes_merges_when_record_exists() -> Result<()> {
    let mut source = FakeSource::default();
    source.members = vec!["aa111bb0001".to_string()];
    source.add_object(
        "aa111bb0001",
        mods_xml("Catalog-backed item"),
        item_public_xml("aa111bb0001", "image", Some("666")),
    );
    source.add_object(COLLECTION, mods_xml("Test Collection"), collection_public_xml(None));

    let p = pipeline(source, MergePolicy::Sometimes, &[]);
    p.catalog.seed("666", json!({"id": "666", "title": "Catalog item"}));

    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.errored, 0);
    assert_eq!(outcome.stats.indexed, 2);
    // merged into the catalog record, not indexed under the druid
    assert!(p.index.doc("aa111bb0001").is_none());
    let merged = p.index.doc("666").unwrap();
    assert_eq!(merged["title"], "Catalog item");
    assert_eq!(merged["druid"], "aa111bb0001");
    assert_eq!(merged["url_fulltext"], "https://purl.example.org/aa111bb0001");
    Ok(())
}

#[tokio::test]
async fn test_merge_policy_sometimes_falls_back_to_standalone() -> Result<()> {
    let mut source = FakeSource::default();
    source.members = vec!["aa111bb0001".to_string()];
    source.add_object(
        "aa111bb0001",
        mods_xml("Catalog-backed item"),
        item_public_xml("aa111bb0001", "image", Some("666")),
    );
    source.add_object(COLLECTION, mods_xml("Test Collection"), collection_public_xml(None));

    // no catalog record seeded: lookup misses, standalone path runs
    let p = pipeline(source, MergePolicy::Sometimes, &[]);
    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.errored, 0);
    assert_eq!(outcome.stats.indexed, 2);
    assert!(p.index.doc("aa111bb0001").is_some());
    Ok(())
}

#[tokio::test]
async fn test_whitelist_bypasses_full_harvest() -> Result<()> {
    let p = pipeline(two_item_source(), MergePolicy::Sometimes, &["aa111bb0002"]);
    let outcome = p.harvester.run(false).await?;

    assert_eq!(outcome.stats.discovered, 2); // one whitelisted item + collection
    assert!(p.index.doc("aa111bb0001").is_none());
    assert!(p.index.doc("aa111bb0002").is_some());
    assert!(outcome.summary.contains("Objects whitelisted: 2"));
    Ok(())
}

#[tokio::test]
async fn test_no_commit_flag_skips_the_final_commit() -> Result<()> {
    let p = pipeline(two_item_source(), MergePolicy::Sometimes, &[]);
    let outcome = p.harvester.run(true).await?;

    assert_eq!(outcome.stats.indexed, 3);
    assert_eq!(p.index.commit_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_source_fails_the_run_at_setup() {
    let mut source = FakeSource::default();
    source.members = vec!["aa111bb0001".to_string()];
    source.broken.insert(COLLECTION.to_string());

    let p = pipeline(source, MergePolicy::Sometimes, &[]);
    assert!(p.harvester.run(false).await.is_err());
}
