use bookshelf_db::{Collection, Filter, FindOptions, SortDirection, SortSpec};

use super::error::BookError;
use super::models::BookId;

/// Next sequential id: highest stored id plus one, or `0` for an empty collection.
///
/// Computed from the store on every call. Two concurrent inserts can compute
/// the same id; the store's unique id key rejects the second one. Fails with
/// [`BookError::IdSpaceExhausted`] once a record holds `BookId::MAX`.
pub async fn next_id(collection: &Collection) -> Result<BookId, BookError> {
    let options = FindOptions::default().sorted(SortSpec::new("id", SortDirection::Descending));
    let highest = collection
        .find_one(&Filter::All, options)
        .await?
        .and_then(|doc| doc.get("id").and_then(serde_json::Value::as_i64));

    match highest {
        None => Ok(0),
        Some(id) => id.checked_add(1).ok_or(BookError::IdSpaceExhausted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::schema::ensure_books_collection;
    use bookshelf_db::{DocumentStore, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn empty_collection_starts_at_zero() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let books = ensure_books_collection(store, "books").await.unwrap();
        assert_eq!(next_id(&books).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn follows_highest_id_not_count() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let books = ensure_books_collection(store, "books").await.unwrap();
        for id in [3, 17] {
            let doc = json!({"id": id, "title": "T", "authors": ["A"]});
            books
                .insert_one(doc.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        assert_eq!(next_id(&books).await.unwrap(), 18);
    }

    #[tokio::test]
    async fn follows_highest_id_beyond_f64_precision() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let books = ensure_books_collection(store, "books").await.unwrap();
        for id in [9_007_199_254_740_993_i64, 9_007_199_254_740_992] {
            let doc = json!({"id": id, "title": "T", "authors": ["A"]});
            books
                .replace_one(id, doc.as_object().cloned().unwrap(), true)
                .await
                .unwrap();
        }
        assert_eq!(next_id(&books).await.unwrap(), 9_007_199_254_740_994);
    }

    #[tokio::test]
    async fn highest_possible_id_exhausts_the_id_space() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let books = ensure_books_collection(store, "books").await.unwrap();
        let doc = json!({"title": "Last", "authors": ["A"]});
        books
            .replace_one(BookId::MAX, doc.as_object().cloned().unwrap(), true)
            .await
            .unwrap();
        assert!(matches!(
            next_id(&books).await,
            Err(BookError::IdSpaceExhausted)
        ));
    }
}
