//! Document store abstraction for the bookshelf service.
//!
//! Record logic talks to a [`DocumentStore`] through a [`Collection`] handle.
//! The handle is only produced by [`ensure_collection`], so nothing can touch
//! a collection before its validator and text index exist.

pub mod collection;
pub mod error;
pub mod memory;
pub mod query;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;

pub use collection::{ensure_collection, Collection};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{Filter, FindOptions, SortDirection, SortSpec};
pub use schema::{CollectionSchema, FieldKind, FieldRule};
pub use sqlite::SqliteStore;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub(crate) fn doc_id(doc: &Document) -> Result<i64, StoreError> {
    doc.get("id")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| StoreError::DocumentValidation("missing integer field 'id'".to_string()))
}

/// Outcome of a replace-or-insert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub matched: u64,
    pub upserted: bool,
}

/// Capabilities the service needs from a document store engine.
///
/// Every document carries an integer `id` field that the store treats as a
/// unique key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Create a collection whose writes are checked against `schema`.
    async fn create_collection(&self, name: &str, schema: CollectionSchema)
        -> Result<(), StoreError>;

    /// Create a combined text index over `fields`.
    async fn create_text_index(&self, name: &str, fields: &[&str]) -> Result<(), StoreError>;

    async fn find(
        &self,
        name: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn insert_one(&self, name: &str, doc: Document) -> Result<(), StoreError>;

    /// Replace the document with `id`, inserting it when absent and `upsert` is set.
    async fn replace_one(
        &self,
        name: &str,
        id: i64,
        doc: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError>;

    /// Delete at most one document and return how many were removed.
    async fn delete_one(&self, name: &str, id: i64) -> Result<u64, StoreError>;

    /// Release the engine. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), StoreError>;
}
