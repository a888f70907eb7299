//! In-process document store engine used by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::query::{compare_values, sort_key, text_score, text_terms};
use crate::{
    doc_id, CollectionSchema, Document, DocumentStore, Filter, FindOptions, ReplaceOutcome,
    SortDirection, StoreError,
};

#[derive(Debug, Clone, Default)]
struct CollectionState {
    schema: CollectionSchema,
    text_fields: Option<Vec<String>>,
    docs: BTreeMap<i64, Document>,
}

/// Document store kept in memory behind an async read/write lock.
///
/// Nothing is persisted; dropping the store discards every collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionState>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn collection<'a>(
    map: &'a HashMap<String, CollectionState>,
    name: &str,
) -> Result<&'a CollectionState, StoreError> {
    map.get(name)
        .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
}

fn collection_mut<'a>(
    map: &'a mut HashMap<String, CollectionState>,
    name: &str,
) -> Result<&'a mut CollectionState, StoreError> {
    map.get_mut(name)
        .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: CollectionSchema,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut map = self.collections.write().await;
        if map.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        map.insert(
            name.to_string(),
            CollectionState {
                schema,
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn create_text_index(&self, name: &str, fields: &[&str]) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut map = self.collections.write().await;
        let state = collection_mut(&mut map, name)?;
        state.text_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        Ok(())
    }

    async fn find(
        &self,
        name: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_open()?;
        let map = self.collections.read().await;
        let state = collection(&map, name)?;

        let mut docs: Vec<Document> = match filter {
            Filter::All => state.docs.values().cloned().collect(),
            Filter::IdEq(id) => state.docs.get(id).cloned().into_iter().collect(),
            Filter::Text(query) => {
                let fields = state
                    .text_fields
                    .as_ref()
                    .ok_or_else(|| StoreError::TextIndexMissing(name.to_string()))?;
                let terms = text_terms(query);
                let mut scored: Vec<(usize, &Document)> = state
                    .docs
                    .values()
                    .map(|doc| (text_score(doc, fields, &terms), doc))
                    .filter(|(score, _)| *score > 0)
                    .collect();
                // Stable: equal scores stay in id order.
                scored.sort_by(|a, b| b.0.cmp(&a.0));
                scored.into_iter().map(|(_, doc)| doc.clone()).collect()
            }
        };

        if let Some(spec) = &options.sort {
            docs.sort_by(|a, b| {
                let ord = compare_values(sort_key(a, &spec.field), sort_key(b, &spec.field));
                match spec.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(docs.into_iter().skip(skip).take(limit).collect())
    }

    async fn insert_one(&self, name: &str, doc: Document) -> Result<(), StoreError> {
        self.ensure_open()?;
        let id = doc_id(&doc)?;
        let mut map = self.collections.write().await;
        let state = collection_mut(&mut map, name)?;
        state.schema.validate(&doc)?;
        if state.docs.contains_key(&id) {
            return Err(StoreError::DuplicateKey(id));
        }
        state.docs.insert(id, doc);
        Ok(())
    }

    async fn replace_one(
        &self,
        name: &str,
        id: i64,
        mut doc: Document,
        upsert: bool,
    ) -> Result<ReplaceOutcome, StoreError> {
        self.ensure_open()?;
        doc.insert("id".to_string(), Value::from(id));
        let mut map = self.collections.write().await;
        let state = collection_mut(&mut map, name)?;
        state.schema.validate(&doc)?;

        let matched = state.docs.contains_key(&id);
        if !matched && !upsert {
            return Ok(ReplaceOutcome {
                matched: 0,
                upserted: false,
            });
        }
        state.docs.insert(id, doc);

        Ok(ReplaceOutcome {
            matched: u64::from(matched),
            upserted: !matched,
        })
    }

    async fn delete_one(&self, name: &str, id: i64) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let mut map = self.collections.write().await;
        let state = collection_mut(&mut map, name)?;
        Ok(u64::from(state.docs.remove(&id).is_some()))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
