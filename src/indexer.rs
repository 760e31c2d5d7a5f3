use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use metrics::counter;
use tracing::{error, info, warn};

use crate::clients::{MetadataSource, SearchIndex};
use crate::collection::CollectionContext;
use crate::constants::{ACCESS_FACET, BUILDING_FACET, COLLECTION_FORMAT, COLLECTION_TYPE};
use crate::document::FieldMapping;
use crate::error::{IndexerError, Result};
use crate::extract::{extract_mods_fields, DateBounds, DisplayType};
use crate::merge::{CatalogMerger, MergePolicy};
use crate::resource::Resource;
use crate::stats::{PhaseTimings, RunStats};
use crate::validate::{
    validate_collection, validate_item, validate_mods_completeness,
};

/// Observer invoked at fixed points in the indexing flow. The default list
/// is empty; core logic never depends on hooks being present.
#[async_trait]
pub trait IndexingHook: Send + Sync {
    async fn before_merge(&self, _druid: &str, _catalog_key: &str, _doc: &mut FieldMapping) {}
    async fn before_index(&self, _druid: &str, _doc: &mut FieldMapping) {}
}

#[derive(Debug, PartialEq)]
enum MergeOutcome {
    Merged,
    Standalone,
}

/// Runs the fetch → build → merge? → validate → submit flow for one object.
///
/// Every collaborator is injected; nothing is looked up through globals.
/// All failures inside the flow are caught at `index_and_record`, counted,
/// and logged; one bad object never aborts the run.
pub struct ObjectIndexer {
    pub source: Arc<dyn MetadataSource>,
    pub index: Arc<dyn SearchIndex>,
    pub merger: Option<Arc<dyn CatalogMerger>>,
    pub context: Arc<CollectionContext>,
    pub stats: Arc<Mutex<RunStats>>,
    pub hooks: Vec<Arc<dyn IndexingHook>>,
    pub purl_base: String,
    pub merge_policy: MergePolicy,
    pub bounds: DateBounds,
}

impl ObjectIndexer {
    /// The per-object failure boundary: outcome lands in RunStats either way.
    pub async fn index_and_record(&self, druid: &str) {
        match self.index_object(druid).await {
            Ok(timings) => {
                counter!("harvest_objects_indexed_total").increment(1);
                self.stats
                    .lock()
                    .expect("stats lock poisoned")
                    .record_success(timings);
            }
            Err(e) => {
                counter!("harvest_object_errors_total").increment(1);
                error!(druid = %druid, error = %e, "indexing failed");
                self.stats
                    .lock()
                    .expect("stats lock poisoned")
                    .record_error(druid);
            }
        }
    }

    async fn index_object(&self, druid: &str) -> Result<PhaseTimings> {
        let t_fetch = Instant::now();
        let resource = Resource::new(druid, self.source.clone());
        let is_collection = resource.is_collection().await?;
        resource.mods().await?;
        let fetch_secs = t_fetch.elapsed().as_secs_f64();

        let t_transform = Instant::now();
        let (mut doc, catalog_key) = if is_collection {
            self.build_collection_doc(&resource).await?
        } else {
            self.build_item_doc(&resource).await?
        };

        let outcome = self
            .merge_decision(druid, catalog_key.as_deref(), &mut doc)
            .await?;
        if outcome == MergeOutcome::Merged {
            return Ok(PhaseTimings {
                fetch_secs,
                transform_secs: t_transform.elapsed().as_secs_f64(),
            });
        }

        for hook in &self.hooks {
            hook.before_index(druid, &mut doc).await;
        }

        let mut messages = if is_collection {
            validate_collection(&doc, druid, &self.purl_base)
        } else {
            validate_item(&doc, druid, &self.purl_base)
        };
        messages.extend(validate_mods_completeness(&doc, druid));
        if !messages.is_empty() {
            warn!(druid = %druid, "{} validation messages", messages.len());
            self.stats
                .lock()
                .expect("stats lock poisoned")
                .record_validation_messages(messages);
        }
        let transform_secs = t_transform.elapsed().as_secs_f64();

        self.index.add(&doc).await?;
        Ok(PhaseTimings {
            fetch_secs,
            transform_secs,
        })
    }

    /// Apply the merge-policy matrix. `Merged` means the object is done;
    /// `Standalone` sends it down the normal submission path.
    async fn merge_decision(
        &self,
        druid: &str,
        catalog_key: Option<&str>,
        doc: &mut FieldMapping,
    ) -> Result<MergeOutcome> {
        let key = catalog_key.filter(|k| !k.trim().is_empty());
        match (self.merge_policy, key) {
            (MergePolicy::Never, Some(key)) => {
                warn!(druid = %druid, catalog_key = %key, "merge policy is never; ignoring catalog key");
                Ok(MergeOutcome::Standalone)
            }
            (MergePolicy::Never, None) | (MergePolicy::Sometimes, None) => {
                Ok(MergeOutcome::Standalone)
            }
            (MergePolicy::Always, None) => Err(IndexerError::CatalogKeyRequired {
                druid: druid.to_string(),
            }),
            (policy, Some(key)) => {
                for hook in &self.hooks {
                    hook.before_merge(druid, key, doc).await;
                }
                let merger = self.merger.as_ref().ok_or_else(|| {
                    IndexerError::Config(
                        "catalog key present but no catalog backend configured".to_string(),
                    )
                })?;
                if merger.merge_and_index(key, doc).await? {
                    info!(druid = %druid, catalog_key = %key, "indexed by catalog merge");
                    Ok(MergeOutcome::Merged)
                } else if policy == MergePolicy::Always {
                    Err(IndexerError::MissingCatalogRecord {
                        druid: druid.to_string(),
                        catalog_key: key.to_string(),
                    })
                } else {
                    info!(druid = %druid, catalog_key = %key, "no catalog record; indexing standalone");
                    Ok(MergeOutcome::Standalone)
                }
            }
        }
    }

    async fn build_item_doc(&self, resource: &Resource) -> Result<(FieldMapping, Option<String>)> {
        let druid = resource.druid();
        let mut doc = FieldMapping::new();

        let display_type = resource.display_type().await?;
        doc.set("display_type", display_type.as_str());
        if let Some(file_ids) = resource.file_ids().await? {
            doc.set("file_id", file_ids);
        }

        if let Some(collections) = resource.collection_druids().await? {
            let mut ids = Vec::new();
            let mut titled = Vec::new();
            for collection_druid in &collections {
                let info = self.context.info(collection_druid).await?;
                ids.push(info.index_id().to_string());
                titled.push(info.with_title());
                self.context
                    .record_display_type(collection_druid, display_type)
                    .await;
            }
            doc.set("collection", ids);
            doc.set("collection_with_title", titled);
        }

        let mods = resource.mods().await?;
        doc.combine(extract_mods_fields(mods, druid, self.bounds));
        self.add_common_fields(&mut doc, druid);

        Ok((doc, resource.catalog_key().await?))
    }

    async fn build_collection_doc(
        &self,
        resource: &Resource,
    ) -> Result<(FieldMapping, Option<String>)> {
        let druid = resource.druid();
        let mut doc = FieldMapping::new();

        doc.set("display_type", DisplayType::Collection.as_str());
        doc.set("collection_type", COLLECTION_TYPE);

        // Aggregate facet over everything the member items contributed
        // during the fan-out; the orchestrator indexes collections last so
        // this set is complete by now.
        let item_types = self.context.display_types(druid).await;
        if !item_types.is_empty() {
            doc.set("item_display_type", item_types);
        }

        let mods = resource.mods().await?;
        doc.combine(extract_mods_fields(mods, druid, self.bounds));

        let mut format = FieldMapping::new();
        format.set("format_main_ssim", COLLECTION_FORMAT);
        doc.combine(format);

        self.add_common_fields(&mut doc, druid);
        Ok((doc, resource.catalog_key().await?))
    }

    fn add_common_fields(&self, doc: &mut FieldMapping, druid: &str) {
        doc.set("id", druid);
        doc.set("druid", druid);
        doc.set(
            "url_fulltext",
            format!("{}/{}", self.purl_base.trim_end_matches('/'), druid).as_str(),
        );
        doc.set("access_facet", ACCESS_FACET);
        doc.set("building_facet", BUILDING_FACET);
    }
}
