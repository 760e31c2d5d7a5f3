use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single field value in a search document: either one string or an
/// ordered list of strings. List order matters; duplicates are removed
/// when mappings are combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl FieldValue {
    /// Members of this value that are non-blank after trimming.
    pub fn present_members(&self) -> Vec<&str> {
        match self {
            FieldValue::One(s) => {
                if s.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![s.as_str()]
                }
            }
            FieldValue::Many(list) => list
                .iter()
                .map(|s| s.as_str())
                .filter(|s| !s.trim().is_empty())
                .collect(),
        }
    }

    fn into_members(self) -> Vec<String> {
        match self {
            FieldValue::One(s) => vec![s],
            FieldValue::Many(list) => list,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::One(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::One(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(list: Vec<String>) -> Self {
        FieldValue::Many(list)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(list: Vec<&str>) -> Self {
        FieldValue::Many(list.into_iter().map(|s| s.to_string()).collect())
    }
}

/// The flat field-name → value mapping submitted to the search index as one
/// document. Keys are kept sorted; insertion order never matters.
///
/// Invariant: a key is only present while at least one of its members is
/// non-blank. `combine` enforces this after every merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    fields: BTreeMap<String, FieldValue>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Blank values are stored as given; they are
    /// swept out the next time `combine` runs and are invisible to
    /// `field_present`.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Normalized value set for a field: the non-blank members, in order.
    pub fn values(&self, field: &str) -> Vec<&str> {
        self.fields
            .get(field)
            .map(|v| v.present_members())
            .unwrap_or_default()
    }

    /// True when the field has at least one non-blank member.
    pub fn field_present(&self, field: &str) -> bool {
        !self.values(field).is_empty()
    }

    /// True when the field's normalized value set contains the literal.
    pub fn field_present_with(&self, field: &str, expected: &str) -> bool {
        self.values(field).iter().any(|v| *v == expected)
    }

    /// True when any normalized member matches the pattern.
    pub fn field_matches(&self, field: &str, pattern: &Regex) -> bool {
        self.values(field).iter().any(|v| pattern.is_match(v))
    }

    /// Merge `incoming` into this mapping.
    ///
    /// For every incoming key with a non-empty normalized value: a key the
    /// base already non-emptily has becomes the de-duplicated concatenation
    /// of base values followed by incoming values (first-seen order, blanks
    /// dropped); an absent key takes the incoming value verbatim. Keys left
    /// with nothing present are deleted afterwards.
    pub fn combine(&mut self, incoming: FieldMapping) -> &mut Self {
        for (key, value) in incoming.fields {
            if value.present_members().is_empty() {
                continue;
            }
            if self.field_present(&key) {
                let existing = self.fields.remove(&key).unwrap();
                let mut merged: Vec<String> = Vec::new();
                for member in existing.into_members().into_iter().chain(value.into_members()) {
                    if member.trim().is_empty() {
                        continue;
                    }
                    if !merged.contains(&member) {
                        merged.push(member);
                    }
                }
                self.fields.insert(key, FieldValue::Many(merged));
            } else {
                self.fields.insert(key, value);
            }
        }
        self.fields
            .retain(|_, v| !v.present_members().is_empty());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The document as Solr JSON-update input.
    pub fn to_solr_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl FromIterator<(String, FieldValue)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
