//! SQLite document store.
//!
//! Each collection is a `docs_<name>` table holding the JSON document next to
//! its integer primary key. A text index is an FTS5 table `fts_<name>` keyed by
//! the same rowid. Collection validators live in the `collections` table.
//! Every write commits before returning.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool};

use crate::query::{is_identifier, text_content, text_terms};
use crate::{
    doc_id, CollectionSchema, Document, DocumentStore, Filter, FindOptions, ReplaceOutcome,
    SortDirection, StoreError,
};

#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    closed: AtomicBool,
}

struct Meta {
    schema: CollectionSchema,
    text_fields: Option<Vec<String>>,
}

fn table(prefix: &str, name: &str) -> Result<String, StoreError> {
    if !is_identifier(name) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(format!("\"{prefix}_{name}\""))
}

async fn load_meta(conn: &mut SqliteConnection, name: &str) -> Result<Meta, StoreError> {
    let row: Option<(String, Option<String>)> =
        sqlx::query_as("SELECT schema, text_fields FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
    let (schema, text_fields) =
        row.ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

    Ok(Meta {
        schema: serde_json::from_str(&schema)?,
        text_fields: text_fields
            .map(|fields| serde_json::from_str(&fields))
            .transpose()?,
    })
}

/// Rewrite the text index row for `id`. No-op for collections without an index.
async fn index_text(
    conn: &mut SqliteConnection,
    name: &str,
    meta: &Meta,
    id: i64,
    doc: &Document,
) -> Result<(), StoreError> {
    let Some(fields) = &meta.text_fields else {
        return Ok(());
    };
    let fts = table("fts", name)?;

    let delete = format!("DELETE FROM {fts} WHERE rowid = ?");
    sqlx::query(&delete).bind(id).execute(&mut *conn).await?;

    let insert = format!("INSERT INTO {fts} (rowid, content) VALUES (?, ?)");
    sqlx::query(&insert)
        .bind(id)
        .bind(text_content(doc, fields))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// FTS5 expression matching any of the query's terms, or `None` when the
/// query has nothing searchable.
fn match_expression(query: &str) -> Option<String> {
    let phrases: Vec<String> = text_terms(query)
        .into_iter()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();
    (!phrases.is_empty()).then(|| phrases.join(" OR "))
}

fn unique_violation(err: sqlx::Error, id: i64) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey(id),
        _ => err.into(),
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl SqliteStore {
    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                schema TEXT NOT NULL,
                text_fields TEXT
            )",
        )
        .execute(&pool)
        .await?;

        tracing::info!(target: "bookshelf-db", path = %path.display(), "sqlite store opened");

        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: CollectionSchema,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let docs = table("docs", name)?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO collections (name, schema) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(serde_json::to_string(&schema)?)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::CollectionExists(name.to_string()));
        }

        let create = format!("CREATE TABLE {docs} (id INTEGER PRIMARY KEY, body TEXT NOT NULL)");
        sqlx::query(&create).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_text_index(&self, name: &str, fields: &[&str]) -> Result<(), StoreError> {
        self.ensure_open()?;
        if let Some(bad) = fields.iter().find(|f| !is_identifier(f)) {
            return Err(StoreError::InvalidName(bad.to_string()));
        }
        let docs = table("docs", name)?;
        let fts = table("fts", name)?;
        let mut tx = self.pool.begin().await?;
        load_meta(&mut tx, name).await?;

        let create = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {fts} USING fts5(content, tokenize = 'porter unicode61')"
        );
        sqlx::query(&create).execute(&mut *tx).await?;
        let clear = format!("DELETE FROM {fts}");
        sqlx::query(&clear).execute(&mut *tx).await?;

        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        sqlx::query("UPDATE collections SET text_fields = ? WHERE name = ?")
            .bind(serde_json::to_string(&fields)?)
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let meta = load_meta(&mut tx, name).await?;
        let select = format!("SELECT id, body FROM {docs}");
        let existing: Vec<(i64, String)> = sqlx::query_as(&select).fetch_all(&mut *tx).await?;
        for (id, body) in existing {
            let doc: Document = serde_json::from_str(&body)?;
            index_text(&mut tx, name, &meta, id, &doc).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find(
        &self,
        name: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_open()?;
        let docs = table("docs", name)?;
        let mut conn = self.pool.acquire().await?;
        let meta = load_meta(&mut conn, name).await?;

        let mut order = Vec::new();
        if let Some(spec) = &options.sort {
            let direction = match spec.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            if spec.field == "id" {
                order.push(format!("d.id {direction}"));
            } else if is_identifier(&spec.field) {
                // Arrays order by their first element.
                order.push(format!(
                    "CASE json_type(d.body, '$.{f}') WHEN 'array' \
                     THEN json_extract(d.body, '$.{f}[0]') \
                     ELSE json_extract(d.body, '$.{f}') END {direction}",
                    f = spec.field
                ));
            } else {
                return Err(StoreError::InvalidName(spec.field.clone()));
            }
        }

        let (source, expression) = match filter {
            Filter::All => (format!("{docs} d"), None),
            Filter::IdEq(_) => (format!("{docs} d WHERE d.id = ?"), None),
            Filter::Text(query) => {
                if meta.text_fields.is_none() {
                    return Err(StoreError::TextIndexMissing(name.to_string()));
                }
                let Some(expression) = match_expression(query) else {
                    return Ok(Vec::new());
                };
                let fts = table("fts", name)?;
                order.push(format!("{fts}.rank"));
                (
                    format!("{docs} d JOIN {fts} ON {fts}.rowid = d.id WHERE {fts} MATCH ?"),
                    Some(expression),
                )
            }
        };
        order.push("d.id".to_string());

        let sql = format!(
            "SELECT d.body FROM {source} ORDER BY {} LIMIT ? OFFSET ?",
            order.join(", ")
        );
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        if let Filter::IdEq(id) = filter {
            query = query.bind(*id);
        }
        if let Some(expression) = expression {
            query = query.bind(expression);
        }
        let limit = options.limit.map_or(-1, to_i64);
        let bodies = query
            .bind(limit)
            .bind(to_i64(options.skip))
            .fetch_all(&mut *conn)
            .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StoreError::from))
            .collect()
    }

    async fn insert_one(&self, name: &str, doc: Document) -> Result<(), StoreError> {
        self.ensure_open()?;
        let id = doc_id(&doc)?;
        let docs = table("docs", name)?;
        let mut tx = self.pool.begin().await?;
        let meta = load_meta(&mut tx, name).await?;
        meta.schema.validate(&doc)?;

        let insert = format!("INSERT INTO {docs} (id, body) VALUES (?, ?)");
        sqlx::query(&insert)
            .bind(id)
            .bind(serde_json::to_string(&doc)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_violation(e, id))?;
        index_text(&mut tx, name, &meta, id, &doc).await?;

        tx.commit().await?;
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
        let docs = table("docs", name)?;
        let mut tx = self.pool.begin().await?;
        let meta = load_meta(&mut tx, name).await?;
        meta.schema.validate(&doc)?;

        let select = format!("SELECT id FROM {docs} WHERE id = ?");
        let matched = sqlx::query_scalar::<_, i64>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !matched && !upsert {
            return Ok(ReplaceOutcome {
                matched: 0,
                upserted: false,
            });
        }

        let write = format!(
            "INSERT INTO {docs} (id, body) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body"
        );
        sqlx::query(&write)
            .bind(id)
            .bind(serde_json::to_string(&doc)?)
            .execute(&mut *tx)
            .await?;
        index_text(&mut tx, name, &meta, id, &doc).await?;

        tx.commit().await?;
        Ok(ReplaceOutcome {
            matched: u64::from(matched),
            upserted: !matched,
        })
    }

    async fn delete_one(&self, name: &str, id: i64) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let docs = table("docs", name)?;
        let mut tx = self.pool.begin().await?;
        let meta = load_meta(&mut tx, name).await?;

        let delete = format!("DELETE FROM {docs} WHERE id = ?");
        let removed = sqlx::query(&delete)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if meta.text_fields.is_some() {
            let delete = format!("DELETE FROM {} WHERE rowid = ?", table("fts", name)?);
            sqlx::query(&delete).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool.close().await;
        tracing::info!(target: "bookshelf-db", "sqlite store closed");
        Ok(())
    }
}
