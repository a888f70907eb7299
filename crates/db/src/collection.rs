use std::sync::Arc;

use crate::{
    CollectionSchema, Document, DocumentStore, Filter, FindOptions, ReplaceOutcome, StoreError,
};

/// Handle to one named collection. Cloning shares the underlying store.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn DocumentStore>,
    name: Arc<str>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.store.find(&self.name, filter, options).await
    }

    /// First document matching `filter` under `options`, if any.
    pub async fn find_one(
        &self,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Option<Document>, StoreError> {
        let docs = self.store.find(&self.name, filter, &options.limit(1)).await?;
        Ok(docs.into_iter().next())
    }

    pub async fn insert_one(&self, doc: Document) -> Result<(), StoreError> {
        self.store.insert_one(&self.name, doc).await
    }

    pub async fn replace_one(
        &self,
        id: i64,
        doc: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        self.store.replace_one(&self.name, id, doc, upsert).await
    }

    pub async fn delete_one(&self, id: i64) -> Result<u64, StoreError> {
        self.store.delete_one(&self.name, id).await
    }
}

/// Make sure `name` exists with `schema` and a text index over `text_fields`.
///
/// An existing collection is left untouched. The returned handle is the only
/// way to reach the collection's documents.
pub async fn ensure_collection(
    store: Arc<dyn DocumentStore>,
    name: &str,
    schema: CollectionSchema,
    text_fields: &[&str],
) -> Result<Collection, StoreError> {
    if store.collection_exists(name).await? {
        tracing::info!(target: "bookshelf-db", collection = name, "collection already exists");
    } else {
        store.create_collection(name, schema).await?;
        store.create_text_index(name, text_fields).await?;
        tracing::info!(
            target: "bookshelf-db",
            collection = name,
            text_fields = ?text_fields,
            "collection created"
        );
    }

    Ok(Collection {
        store,
        name: Arc::from(name),
    })
}
