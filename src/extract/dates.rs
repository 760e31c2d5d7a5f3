use once_cell::sync::Lazy;
use regex::Regex;

/// A publication date normalized for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// Zero-padded four digit year for the sort field; BCE years are mapped
    /// to `-(1000 - year)` so they collate before all CE years.
    pub sort: String,
    /// Human form for facet and display fields ("1886", "300 B.C.").
    pub facet: String,
    /// Year for the date slider. BCE dates carry no slider value.
    pub slider: Option<i32>,
}

static CENTURY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})(?:st|nd|rd|th)\s+century").unwrap());
static BCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d{1,4})\s*B\.?\s*C\.?").unwrap());
static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})").unwrap());
static DECADE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{3})[-_?]").unwrap());
static LONE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{1,3})\s*$").unwrap());

/// Normalize a raw publication date string from descriptive metadata.
///
/// Handles the usual mess: "Aug. 3rd, [18]86?", "19th century", "300 B.C.",
/// "186-?", "c1905". Years outside `[min_year, max_year]` are rejected so a
/// typo like "19560" never reaches the index.
pub fn normalize_pub_date(raw: &str, min_year: i32, max_year: i32) -> Option<NormalizedDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = BCE.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        if -year < min_year {
            return None;
        }
        return Some(NormalizedDate {
            sort: (-(1000 - year)).to_string(),
            facet: format!("{} B.C.", year),
            slider: None,
        });
    }

    if let Some(caps) = CENTURY.captures(raw) {
        let century: i32 = caps[1].parse().ok()?;
        let year = (century - 1) * 100;
        return in_bounds(year, min_year, max_year);
    }

    // Brackets mark editorial completion: "[18]86" means 1886.
    let unbracketed: String = raw.chars().filter(|c| *c != '[' && *c != ']').collect();

    if let Some(caps) = FOUR_DIGITS.captures(&unbracketed) {
        let year: i32 = caps[1].parse().ok()?;
        return in_bounds(year, min_year, max_year);
    }

    // "186-" or "186?" means the decade is known: use its first year.
    if let Some(caps) = DECADE.captures(&unbracketed) {
        let year: i32 = format!("{}0", &caps[1]).parse().ok()?;
        return in_bounds(year, min_year, max_year);
    }

    if let Some(caps) = LONE_NUMBER.captures(&unbracketed) {
        let year: i32 = caps[1].parse().ok()?;
        return in_bounds(year, min_year, max_year);
    }

    None
}

fn in_bounds(year: i32, min_year: i32, max_year: i32) -> Option<NormalizedDate> {
    if year < min_year || year > max_year {
        return None;
    }
    Some(NormalizedDate {
        sort: format!("{:04}", year),
        facet: year.to_string(),
        slider: Some(year),
    })
}
