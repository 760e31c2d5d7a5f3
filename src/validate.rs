use crate::constants::{
    display_type_vocabulary, ACCESS_FACET, BUILDING_FACET, COLLECTION_FORMAT, COLLECTION_TITLE_SEP,
    COLLECTION_TYPE,
};
use crate::document::FieldMapping;

/// Checks every document kind must satisfy before submission. Returns an
/// ordered list of human-readable deficiency messages; empty means valid.
/// Deficiencies are advisory: the caller logs them and indexes anyway.
pub fn validate_generic(doc: &FieldMapping, druid: &str, purl_base: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if !doc.field_present_with("druid", druid) {
        messages.push(format!("{}: druid field does not echo the object druid", druid));
    }
    let expected_url = format!("{}/{}", purl_base.trim_end_matches('/'), druid);
    if !doc.field_present_with("url_fulltext", &expected_url) {
        messages.push(format!("{}: url_fulltext is not {}", druid, expected_url));
    }
    if !doc.field_present_with("access_facet", ACCESS_FACET) {
        messages.push(format!("{}: access_facet is not {}", druid, ACCESS_FACET));
    }
    let vocabulary = display_type_vocabulary();
    if !doc
        .values("display_type")
        .iter()
        .any(|v| vocabulary.contains(v))
    {
        messages.push(format!(
            "{}: display_type is not one of {}",
            druid,
            vocabulary.join(", ")
        ));
    }
    if !doc.field_present_with("building_facet", BUILDING_FACET) {
        messages.push(format!("{}: building_facet is not {}", druid, BUILDING_FACET));
    }

    messages
}

/// Item documents additionally need collection membership, a titled
/// composite for every declared collection, and file identifiers.
pub fn validate_item(doc: &FieldMapping, druid: &str, purl_base: &str) -> Vec<String> {
    let mut messages = validate_generic(doc, druid, purl_base);

    if !doc.field_present("collection") {
        messages.push(format!("{}: item has no collection membership", druid));
    } else {
        for collection_id in doc.values("collection") {
            let prefix = format!("{}{}", collection_id, COLLECTION_TITLE_SEP);
            let titled = doc
                .values("collection_with_title")
                .iter()
                .any(|v| v.starts_with(&prefix) && v.len() > prefix.len());
            if !titled {
                messages.push(format!(
                    "{}: collection_with_title has no titled entry for {}",
                    druid, collection_id
                ));
            }
        }
    }

    if !doc.field_present("file_id") {
        messages.push(format!("{}: item has no file_id values", druid));
    }

    messages
}

/// Collection documents additionally carry the fixed collection-type and
/// archive/manuscript format literals.
pub fn validate_collection(doc: &FieldMapping, druid: &str, purl_base: &str) -> Vec<String> {
    let mut messages = validate_generic(doc, druid, purl_base);

    if !doc.field_present_with("collection_type", COLLECTION_TYPE) {
        messages.push(format!("{}: collection_type is not {}", druid, COLLECTION_TYPE));
    }
    if !doc.field_present_with("format_main_ssim", COLLECTION_FORMAT) {
        messages.push(format!(
            "{}: collection format_main_ssim does not include {}",
            druid, COLLECTION_FORMAT
        ));
    }

    messages
}

/// Advisory completeness check over the descriptive-metadata families:
/// a document without a title, author, or date is worth a note in the run
/// log even though it still gets indexed.
pub fn validate_mods_completeness(doc: &FieldMapping, druid: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if !doc.field_present("title_display") {
        messages.push(format!("{}: no title found in descriptive metadata", druid));
    }
    if !doc.field_present("author_person_search") && !doc.field_present("author_corp_search") {
        messages.push(format!("{}: no author found in descriptive metadata", druid));
    }
    if !doc.field_present("pub_date_sort") {
        messages.push(format!("{}: no publication date found", druid));
    }

    messages
}
