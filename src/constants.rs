/// Fixed field literals shared between document building and validation.
/// Every standalone document carries these; validators check them back.

// Facet literals stamped onto every document
pub const ACCESS_FACET: &str = "Online";
pub const BUILDING_FACET: &str = "Digital Repository";

// Collection-record literals
pub const COLLECTION_TYPE: &str = "Digital Collection";
pub const COLLECTION_FORMAT: &str = "Archive/Manuscript";

// Separator between a collection druid and its title in the composite
// collection_with_title field ("druid-|-Title")
pub const COLLECTION_TITLE_SEP: &str = "-|-";

/// Display-type values a document may legally carry.
pub fn display_type_vocabulary() -> Vec<&'static str> {
    vec!["book", "image", "file", "collection"]
}
