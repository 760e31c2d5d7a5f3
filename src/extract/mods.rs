use tracing::warn;

use crate::document::FieldMapping;
use crate::extract::dates::normalize_pub_date;
use crate::xml::XmlNode;

/// Year bounds used to sanity-filter extracted publication dates.
#[derive(Debug, Clone, Copy)]
pub struct DateBounds {
    pub min_year: i32,
    pub max_year: i32,
}

/// Extract the descriptive-metadata field families from a parsed MODS tree.
///
/// Pure over its input: no network, no mutation. A field key appears only
/// when the underlying element exists and is non-empty; a sparse mapping is
/// a normal outcome, never an error.
pub fn extract_mods_fields(mods: &XmlNode, druid: &str, bounds: DateBounds) -> FieldMapping {
    let mut doc = FieldMapping::new();

    add_titles(&mut doc, mods);
    add_authors(&mut doc, mods);
    add_subjects(&mut doc, mods);
    add_languages(&mut doc, mods);
    add_physical_description(&mut doc, mods);
    add_summary_and_toc(&mut doc, mods);
    add_publication(&mut doc, mods, bounds);
    add_format(&mut doc, mods, druid);

    doc
}

fn add_titles(doc: &mut FieldMapping, mods: &XmlNode) {
    let mut main_title = None;
    let mut variants = Vec::new();

    for title_info in mods.children_named("titleInfo") {
        let title = title_info
            .child("title")
            .map(|t| t.text_trim().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let full = match title_info.child("subTitle").map(|s| s.text_trim()) {
            Some(sub) if !sub.is_empty() => format!("{} : {}", title, sub),
            _ => title,
        };
        if title_info.attr("type").is_some() {
            variants.push(full);
        } else if main_title.is_none() {
            main_title = Some(full);
        } else {
            variants.push(full);
        }
    }

    if let Some(title) = main_title {
        doc.set("title_display", title.as_str());
        doc.set("title_search", title.as_str());
        // Leading non-sorting articles live in <nonSort>; the sort key is
        // the bare title element content.
        doc.set("title_sort", title.as_str());
    }
    if !variants.is_empty() {
        doc.set("title_variant_search", variants);
    }
}

fn add_authors(doc: &mut FieldMapping, mods: &XmlNode) {
    let mut personal = Vec::new();
    let mut corporate = Vec::new();

    for name in mods.children_named("name") {
        let parts: Vec<String> = name
            .children_named("namePart")
            .map(|p| p.text_trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            continue;
        }
        let display = parts.join(", ");
        match name.attr("type") {
            Some("personal") => personal.push(display),
            Some("corporate") => corporate.push(display),
            _ => personal.push(display),
        }
    }

    if let Some(first) = personal.first().or_else(|| corporate.first()) {
        doc.set("author_sort", first.as_str());
    }
    if !personal.is_empty() {
        doc.set("author_person_display", personal.clone());
        doc.set("author_person_search", personal);
    }
    if !corporate.is_empty() {
        doc.set("author_corp_search", corporate);
    }
}

fn add_subjects(doc: &mut FieldMapping, mods: &XmlNode) {
    let mut topics = Vec::new();
    let mut geographic = Vec::new();
    let mut temporal = Vec::new();

    for subject in mods.children_named("subject") {
        for child in &subject.children {
            let text = child.text_trim();
            if text.is_empty() {
                continue;
            }
            match child.name.as_str() {
                "topic" => topics.push(text.to_string()),
                "geographic" => geographic.push(text.to_string()),
                "temporal" => temporal.push(text.to_string()),
                _ => {}
            }
        }
    }

    if !topics.is_empty() {
        doc.set("topic_search", topics.clone());
        doc.set("topic_facet", topics);
    }
    if !geographic.is_empty() {
        doc.set("geographic_search", geographic.clone());
        doc.set("geographic_facet", geographic);
    }
    if !temporal.is_empty() {
        doc.set("era_facet", temporal);
    }
}

fn add_languages(doc: &mut FieldMapping, mods: &XmlNode) {
    let languages: Vec<String> = mods
        .children_named("language")
        .flat_map(|l| l.children_named("languageTerm"))
        .filter(|t| t.attr("type") != Some("code"))
        .map(|t| t.text_trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if !languages.is_empty() {
        doc.set("language", languages);
    }
}

fn add_physical_description(doc: &mut FieldMapping, mods: &XmlNode) {
    let mut physical = Vec::new();
    for desc in mods.children_named("physicalDescription") {
        for extent in desc.children_named("extent") {
            let text = extent.text_trim();
            if !text.is_empty() {
                physical.push(text.to_string());
            }
        }
        for form in desc.children_named("form") {
            let text = form.text_trim();
            if !text.is_empty() {
                physical.push(text.to_string());
            }
        }
    }
    if !physical.is_empty() {
        doc.set("physical", physical);
    }
}

fn add_summary_and_toc(doc: &mut FieldMapping, mods: &XmlNode) {
    let summaries: Vec<String> = mods
        .children_named("abstract")
        .map(|a| a.text_trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if !summaries.is_empty() {
        doc.set("summary_search", summaries);
    }

    let toc: Vec<String> = mods
        .children_named("tableOfContents")
        .map(|t| t.text_trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if !toc.is_empty() {
        doc.set("toc_search", toc);
    }
}

fn add_publication(doc: &mut FieldMapping, mods: &XmlNode, bounds: DateBounds) {
    let mut pub_search = Vec::new();
    let mut raw_dates = Vec::new();

    for origin in mods.children_named("originInfo") {
        for publisher in origin.children_named("publisher") {
            let text = publisher.text_trim();
            if !text.is_empty() {
                pub_search.push(text.to_string());
            }
        }
        for place in origin.children_named("place") {
            for term in place.children_named("placeTerm") {
                if term.attr("type") == Some("code") {
                    continue;
                }
                let text = term.text_trim();
                if !text.is_empty() {
                    pub_search.push(text.to_string());
                }
            }
        }
        for date_el in ["dateIssued", "dateCreated"] {
            for date in origin.children_named(date_el) {
                let text = date.text_trim();
                if !text.is_empty() {
                    raw_dates.push(text.to_string());
                }
            }
        }
    }

    if !pub_search.is_empty() {
        doc.set("pub_search", pub_search);
    }

    // First date that normalizes wins; the rest are historical noise.
    for raw in &raw_dates {
        if let Some(date) = normalize_pub_date(raw, bounds.min_year, bounds.max_year) {
            doc.set("pub_date_sort", date.sort.as_str());
            doc.set("pub_date", date.facet.as_str());
            if let Some(year) = date.slider {
                doc.set("pub_year_tisim", year.to_string());
            }
            break;
        }
    }
}

fn add_format(doc: &mut FieldMapping, mods: &XmlNode, druid: &str) {
    let issuance_continuing = mods
        .children_named("originInfo")
        .flat_map(|o| o.children_named("issuance"))
        .any(|i| i.text_trim() == "continuing");

    let mut formats = Vec::new();
    for type_of in mods.children_named("typeOfResource") {
        let format = match type_of.text_trim() {
            "text" if issuance_continuing => "Journal/Periodical",
            "text" => "Book",
            "still image" => "Image",
            "cartographic" => "Map",
            "sound recording" | "sound recording-musical" | "sound recording-nonmusical" => {
                "Sound recording"
            }
            "moving image" => "Video",
            "three dimensional object" => "Object",
            "mixed material" => "Archive/Manuscript",
            "software, multimedia" => "Software/Multimedia",
            _ => continue,
        };
        if !formats.contains(&format.to_string()) {
            formats.push(format.to_string());
        }
    }

    if formats.is_empty() {
        warn!(druid = %druid, "no resolvable format from typeOfResource");
    } else {
        doc.set("format_main_ssim", formats);
    }
}
