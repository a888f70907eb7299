//! Books collection validator and text index.

use std::sync::Arc;

use bookshelf_db::{
    ensure_collection, Collection, CollectionSchema, DocumentStore, FieldKind, StoreError,
};
use chrono::Datelike;

/// Earliest accepted publication year.
pub const MIN_PUBLICATION_YEAR: i64 = 1800;

/// Fields covered by the combined text index.
pub const TEXT_INDEX_FIELDS: &[&str] = &["title", "authors", "description"];

pub fn current_year() -> i64 {
    i64::from(chrono::Utc::now().year())
}

/// Validator for book documents, bounding `publicationYear` by `current_year`.
pub fn books_schema(current_year: i64) -> CollectionSchema {
    CollectionSchema::new()
        .require("id", FieldKind::Integer { min: Some(0), max: None })
        .require("title", FieldKind::String)
        .require("authors", FieldKind::StringArray)
        .optional("description", FieldKind::String)
        .optional(
            "publicationYear",
            FieldKind::Integer {
                min: Some(MIN_PUBLICATION_YEAR),
                max: Some(current_year),
            },
        )
}

/// Create the books collection with its validator and text index unless it
/// already exists.
pub async fn ensure_books_collection(
    store: Arc<dyn DocumentStore>,
    name: &str,
) -> Result<Collection, StoreError> {
    ensure_collection(store, name, books_schema(current_year()), TEXT_INDEX_FIELDS).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::{Filter, FindOptions, MemoryStore};
    use serde_json::json;

    #[tokio::test]
    async fn guard_creates_validator_and_text_index() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let books = ensure_books_collection(store.clone(), "books").await.unwrap();
        assert!(store.collection_exists("books").await.unwrap());

        let invalid = json!({"id": 0, "title": "No authors"});
        assert!(books
            .insert_one(invalid.as_object().cloned().unwrap())
            .await
            .is_err());

        let valid = json!({"id": 0, "title": "Dune", "authors": ["Frank Herbert"]});
        books
            .insert_one(valid.as_object().cloned().unwrap())
            .await
            .unwrap();
        let hits = books
            .find(&Filter::Text("herbert".into()), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn guard_is_idempotent() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        ensure_books_collection(store.clone(), "books").await.unwrap();
        ensure_books_collection(store, "books").await.unwrap();
    }
}
