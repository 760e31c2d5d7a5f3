use std::sync::Arc;

use once_cell::sync::OnceCell as SyncOnceCell;
use tokio::sync::OnceCell;

use crate::clients::MetadataSource;
use crate::error::{IndexerError, Result};
use crate::extract::public_xml;
use crate::extract::DisplayType;
use crate::xml::XmlNode;

/// One repository object as seen during a run: its druid, its two raw
/// documents (each fetched at most once and cached for the object's
/// lifetime), and the manifest facts memoized off the public XML.
///
/// Created when the orchestrator enumerates a collection; lives for one
/// indexing flow; never persisted.
pub struct Resource {
    druid: String,
    source: Arc<dyn MetadataSource>,
    mods: OnceCell<XmlNode>,
    public: OnceCell<XmlNode>,
    display_type: SyncOnceCell<DisplayType>,
    file_ids: SyncOnceCell<Option<Vec<String>>>,
    is_collection: SyncOnceCell<bool>,
    collections: SyncOnceCell<Option<Vec<String>>>,
    catalog_key: SyncOnceCell<Option<String>>,
    label: SyncOnceCell<Option<String>>,
}

impl Resource {
    pub fn new(druid: &str, source: Arc<dyn MetadataSource>) -> Self {
        Self {
            druid: druid.to_string(),
            source,
            mods: OnceCell::new(),
            public: OnceCell::new(),
            display_type: SyncOnceCell::new(),
            file_ids: SyncOnceCell::new(),
            is_collection: SyncOnceCell::new(),
            collections: SyncOnceCell::new(),
            catalog_key: SyncOnceCell::new(),
            label: SyncOnceCell::new(),
        }
    }

    pub fn druid(&self) -> &str {
        &self.druid
    }

    /// The parsed MODS document. An empty document is an object-level error,
    /// distinguishable from transport failures.
    pub async fn mods(&self) -> Result<&XmlNode> {
        self.mods
            .get_or_try_init(|| async {
                let raw = self.source.mods(&self.druid).await?;
                let node = XmlNode::parse(&raw)?;
                if node.is_empty() {
                    return Err(IndexerError::MissingMetadata {
                        druid: self.druid.clone(),
                        kind: "MODS",
                    });
                }
                Ok(node)
            })
            .await
    }

    /// The parsed public XML manifest.
    pub async fn public_xml(&self) -> Result<&XmlNode> {
        self.public
            .get_or_try_init(|| async {
                let raw = self.source.public_xml(&self.druid).await?;
                let node = XmlNode::parse(&raw)?;
                if node.is_empty() {
                    return Err(IndexerError::MissingMetadata {
                        druid: self.druid.clone(),
                        kind: "public XML",
                    });
                }
                Ok(node)
            })
            .await
    }

    pub async fn display_type(&self) -> Result<DisplayType> {
        if let Some(dt) = self.display_type.get() {
            return Ok(*dt);
        }
        let public = self.public_xml().await?;
        Ok(*self
            .display_type
            .get_or_init(|| public_xml::display_type(public)))
    }

    pub async fn file_ids(&self) -> Result<Option<Vec<String>>> {
        if let Some(ids) = self.file_ids.get() {
            return Ok(ids.clone());
        }
        let dt = self.display_type().await?;
        let public = self.public_xml().await?;
        Ok(self
            .file_ids
            .get_or_init(|| public_xml::file_ids(public, dt))
            .clone())
    }

    pub async fn is_collection(&self) -> Result<bool> {
        if let Some(flag) = self.is_collection.get() {
            return Ok(*flag);
        }
        let public = self.public_xml().await?;
        Ok(*self
            .is_collection
            .get_or_init(|| public_xml::is_collection(public)))
    }

    pub async fn collection_druids(&self) -> Result<Option<Vec<String>>> {
        if let Some(druids) = self.collections.get() {
            return Ok(druids.clone());
        }
        let public = self.public_xml().await?;
        Ok(self
            .collections
            .get_or_init(|| public_xml::collection_druids(public))
            .clone())
    }

    pub async fn catalog_key(&self) -> Result<Option<String>> {
        if let Some(key) = self.catalog_key.get() {
            return Ok(key.clone());
        }
        let public = self.public_xml().await?;
        Ok(self
            .catalog_key
            .get_or_init(|| public_xml::catalog_key(public))
            .clone())
    }

    pub async fn label(&self) -> Result<Option<String>> {
        if let Some(label) = self.label.get() {
            return Ok(label.clone());
        }
        let public = self.public_xml().await?;
        Ok(self
            .label
            .get_or_init(|| public_xml::object_label(public))
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        mods_calls: AtomicUsize,
        public_calls: AtomicUsize,
        mods_xml: String,
        public_xml: String,
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        async fn mods(&self, _druid: &str) -> Result<String> {
            self.mods_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.mods_xml.clone())
        }

        async fn public_xml(&self, _druid: &str) -> Result<String> {
            self.public_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.public_xml.clone())
        }

        async fn member_druids(&self, _collection_druid: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn counting_source(mods: &str, public: &str) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            mods_calls: AtomicUsize::new(0),
            public_calls: AtomicUsize::new(0),
            mods_xml: mods.to_string(),
            public_xml: public.to_string(),
        })
    }

    #[tokio::test]
    async fn test_documents_are_fetched_once() {
        let source = counting_source(
            "<mods><titleInfo><title>T</title></titleInfo></mods>",
            r#"<publicObject><contentMetadata type="image"/></publicObject>"#,
        );
        let resource = Resource::new("aa111bb2222", source.clone());

        resource.mods().await.unwrap();
        resource.mods().await.unwrap();
        assert_eq!(source.mods_calls.load(Ordering::SeqCst), 1);

        resource.display_type().await.unwrap();
        resource.file_ids().await.unwrap();
        resource.is_collection().await.unwrap();
        assert_eq!(source.public_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_mods_is_a_distinguishable_error() {
        let source = counting_source("<mods/>", "<publicObject><a>x</a></publicObject>");
        let resource = Resource::new("aa111bb2222", source);
        let err = resource.mods().await.unwrap_err();
        assert!(matches!(err, IndexerError::MissingMetadata { kind: "MODS", .. }));
    }

    #[tokio::test]
    async fn test_manifest_facts() {
        let source = counting_source(
            "<mods><titleInfo><title>T</title></titleInfo></mods>",
            r#"<publicObject>
                 <identityMetadata>
                   <objectType>item</objectType>
                   <otherId name="catkey">12345</otherId>
                 </identityMetadata>
                 <contentMetadata type="book">
                   <resource type="page"><file id="p1.jp2"/></resource>
                 </contentMetadata>
                 <RDF><Description>
                   <isMemberOfCollection resource="info:fedora/druid:cc111dd2222"/>
                 </Description></RDF>
               </publicObject>"#,
        );
        let resource = Resource::new("aa111bb2222", source);
        assert_eq!(resource.display_type().await.unwrap(), DisplayType::Book);
        assert_eq!(
            resource.file_ids().await.unwrap(),
            Some(vec!["p1.jp2".to_string()])
        );
        assert!(!resource.is_collection().await.unwrap());
        assert_eq!(
            resource.collection_druids().await.unwrap(),
            Some(vec!["cc111dd2222".to_string()])
        );
        assert_eq!(resource.catalog_key().await.unwrap(), Some("12345".to_string()));
    }
}
