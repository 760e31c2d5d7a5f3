use std::fmt;

use serde::{Deserialize, Serialize};

use crate::xml::XmlNode;

/// Controlled vocabulary classifying how an object renders and which file
/// resources are surfaced for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    Book,
    Image,
    File,
    Collection,
}

impl DisplayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayType::Book => "book",
            DisplayType::Image => "image",
            DisplayType::File => "file",
            DisplayType::Collection => "collection",
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display type from the content-description type attribute. Total with a
/// safe default: unknown and missing types are plain files.
pub fn display_type(public: &XmlNode) -> DisplayType {
    let content_type = public
        .child("contentMetadata")
        .and_then(|c| c.attr("type"))
        .unwrap_or_default();
    match content_type {
        "book" => DisplayType::Book,
        "image" | "manuscript" | "map" => DisplayType::Image,
        _ => DisplayType::File,
    }
}

/// File identifiers surfaced for the object, filtered by display type:
/// image objects only surface image-typed resources, books and files take
/// every file resource. `None` when nothing is found.
pub fn file_ids(public: &XmlNode, display_type: DisplayType) -> Option<Vec<String>> {
    let content = public.child("contentMetadata")?;
    let mut ids = Vec::new();
    for resource in content.children_named("resource") {
        if display_type == DisplayType::Image && resource.attr("type") != Some("image") {
            continue;
        }
        for file in resource.descendants("file") {
            if let Some(id) = file.attr("id") {
                if !id.is_empty() && !ids.contains(&id.to_string()) {
                    ids.push(id.to_string());
                }
            }
        }
    }
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

/// True when the identity subtree declares the object a collection.
pub fn is_collection(public: &XmlNode) -> bool {
    public
        .child("identityMetadata")
        .map(|identity| {
            identity
                .children_named("objectType")
                .any(|t| t.text_trim() == "collection")
        })
        .unwrap_or(false)
}

/// Distinct druids of the collections this object declares membership in,
/// from isMemberOfCollection relationship statements. `None` when none.
pub fn collection_druids(public: &XmlNode) -> Option<Vec<String>> {
    let mut druids = Vec::new();
    for statement in public.descendants("isMemberOfCollection") {
        if let Some(resource) = statement.attr("resource") {
            let druid = bare_druid(resource);
            if !druid.is_empty() && !druids.contains(&druid) {
                druids.push(druid);
            }
        }
    }
    if druids.is_empty() {
        None
    } else {
        Some(druids)
    }
}

/// Catalog key from the identity subtree, when the object is catalog-backed.
pub fn catalog_key(public: &XmlNode) -> Option<String> {
    let identity = public.child("identityMetadata")?;
    identity
        .children_named("otherId")
        .find(|other| other.attr("name") == Some("catkey"))
        .map(|other| other.text_trim().to_string())
        .filter(|key| !key.is_empty())
}

/// The object label from the identity subtree; collections use it as their
/// display title.
pub fn object_label(public: &XmlNode) -> Option<String> {
    public
        .child("identityMetadata")
        .and_then(|identity| identity.child("objectLabel"))
        .map(|label| label.text_trim().to_string())
        .filter(|label| !label.is_empty())
}

/// Strip repository URI prefixes down to the bare druid.
fn bare_druid(resource_uri: &str) -> String {
    resource_uri
        .rsplit('/')
        .next()
        .unwrap_or(resource_uri)
        .trim_start_matches("druid:")
        .to_string()
}
