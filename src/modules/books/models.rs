use bookshelf_db::Document;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::schema::MIN_PUBLICATION_YEAR;

/// Identifier of a stored book.
pub type BookId = i64;

/// A persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Always stored in lexicographic order.
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i64>,
}

impl Book {
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(doc))
    }

    /// Stored form. Absent optional fields are left out rather than set to null.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("id".to_string(), self.id.into());
        doc.insert("title".to_string(), self.title.clone().into());
        doc.insert("authors".to_string(), self.authors.clone().into());
        if let Some(description) = &self.description {
            doc.insert("description".to_string(), description.clone().into());
        }
        if let Some(year) = self.publication_year {
            doc.insert("publicationYear".to_string(), year.into());
        }
        doc
    }
}

/// Request body for create and upsert. Every field is optional here so that
/// missing fields can be reported precisely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub id: Option<BookId>,
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub publication_year: Option<i64>,
}

/// A validated book that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    title: String,
    authors: Vec<String>,
    description: Option<String>,
    publication_year: Option<i64>,
}

impl BookDraft {
    /// Validate `input` and normalize it for storage.
    pub fn from_input(input: BookInput, current_year: i64) -> Result<Self, ValidationError> {
        let title = input
            .title
            .ok_or(ValidationError::MissingRequiredField("title"))?;
        if title.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "title",
                reason: "must not be empty".to_string(),
            });
        }

        let mut authors = input
            .authors
            .ok_or(ValidationError::MissingRequiredField("authors"))?;
        if authors.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "authors",
                reason: "must list at least one author".to_string(),
            });
        }
        authors.sort();

        if let Some(year) = input.publication_year {
            if !(MIN_PUBLICATION_YEAR..=current_year).contains(&year) {
                return Err(ValidationError::InvalidField {
                    field: "publicationYear",
                    reason: format!("must be between {MIN_PUBLICATION_YEAR} and {current_year}"),
                });
            }
        }

        Ok(Self {
            title,
            authors,
            description: input.description,
            publication_year: input.publication_year,
        })
    }

    pub fn with_id(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title,
            authors: self.authors,
            description: self.description,
            publication_year: self.publication_year,
        }
    }
}
