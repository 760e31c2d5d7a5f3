// Extraction: deterministic transforms from fetched XML documents into
// partial field mappings. No network access happens below this module.

pub mod dates;
pub mod mods;
pub mod public_xml;

pub use dates::normalize_pub_date;
pub use mods::{extract_mods_fields, DateBounds};
pub use public_xml::DisplayType;
