//! Collection validators.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Document, StoreError};

/// Expected JSON shape of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String,
    StringArray,
    Integer { min: Option<i64>, max: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Validator attached to a collection and checked on every write.
///
/// Fields not listed in `fields` are accepted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub required: Vec<String>,
    pub fields: Vec<FieldRule>,
}

impl CollectionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field that must be present.
    pub fn require(mut self, name: &str, kind: FieldKind) -> Self {
        self.required.push(name.to_string());
        self.fields.push(FieldRule::new(name, kind));
        self
    }

    /// Add a field that is checked only when present.
    pub fn optional(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push(FieldRule::new(name, kind));
        self
    }

    pub fn validate(&self, doc: &Document) -> Result<(), StoreError> {
        for name in &self.required {
            if !doc.contains_key(name) {
                return Err(StoreError::DocumentValidation(format!(
                    "missing required field '{name}'"
                )));
            }
        }

        for rule in &self.fields {
            let Some(value) = doc.get(&rule.name) else {
                continue;
            };
            if !matches_kind(value, &rule.kind) {
                return Err(StoreError::DocumentValidation(format!(
                    "field '{}' does not match {:?}",
                    rule.name, rule.kind
                )));
            }
        }

        Ok(())
    }
}

fn matches_kind(value: &Value, kind: &FieldKind) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::StringArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Integer { min, max } => match value.as_i64() {
            Some(n) => min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m),
            None => false,
        },
    }
}
