//! Filters, sort specifications and value ordering shared by store engines.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::Document;

/// Which documents a query selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    IdEq(i64),
    /// Free-text search against the collection's text index.
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Sort, skip and limit applied after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(mut self, spec: SortSpec) -> Self {
        self.sort = Some(spec);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Value used when ordering by `field`. Arrays order by their first element.
pub fn sort_key<'a>(doc: &'a Document, field: &str) -> Option<&'a Value> {
    match doc.get(field)? {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Integers compare exactly; floats fall back to `f64` ordering.
fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (as_integer(x), as_integer(y)) {
        return x.cmp(&y);
    }
    let x = x.as_f64().unwrap_or_default();
    let y = y.as_f64().unwrap_or_default();
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Total order over optional JSON values: missing/null, numbers, strings,
/// then everything else by type.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => compare_numbers(x, y),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Lowercased search terms of a free-text query.
pub fn text_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Lowercased text of the indexed `fields`, one space-separated run.
/// Array fields contribute each string member.
pub fn text_content(doc: &Document, fields: &[String]) -> String {
    let mut haystack = String::new();
    for field in fields {
        match doc.get(field) {
            Some(Value::String(s)) => {
                haystack.push_str(&s.to_lowercase());
                haystack.push(' ');
            }
            Some(Value::Array(items)) => {
                for item in items.iter().filter_map(Value::as_str) {
                    haystack.push_str(&item.to_lowercase());
                    haystack.push(' ');
                }
            }
            _ => {}
        }
    }
    haystack
}

/// Number of distinct `terms` found as substrings of the indexed fields.
pub fn text_score(doc: &Document, fields: &[String], terms: &[String]) -> usize {
    let haystack = text_content(doc, fields);
    terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count()
}

/// Collection and field names an engine may splice into its own queries.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
