//! Create, read, update, delete and search over the books collection.

use bookshelf_db::{Collection, Filter, FindOptions};

use super::error::{BookError, ValidationError};
use super::ids::next_id;
use super::models::{Book, BookDraft, BookId, BookInput};
use super::query::{parse_id, ListParams, SearchParams};
use super::schema::current_year;

/// Result of a replace-or-insert by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub book: Book,
    pub created: bool,
}

/// Record operations. Callers are expected to have verified the bearer token.
#[derive(Debug, Clone)]
pub struct BookService {
    books: Collection,
}

fn decode_all(docs: Vec<bookshelf_db::Document>) -> Result<Vec<Book>, BookError> {
    docs.into_iter()
        .map(|doc| Book::from_document(doc).map_err(BookError::from))
        .collect()
}

impl BookService {
    pub fn new(books: Collection) -> Self {
        Self { books }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<Book>, BookError> {
        let plan = params.plan()?;
        let docs = self.books.find(&Filter::All, &plan.find_options()).await?;
        tracing::debug!(
            skip = plan.skip,
            limit = plan.limit,
            sort = ?plan.sort,
            returned = docs.len(),
            "books listed"
        );
        decode_all(docs)
    }

    pub async fn get(&self, raw_id: &str) -> Result<Option<Book>, BookError> {
        let id = parse_id(raw_id)?;
        self.books
            .find_one(&Filter::IdEq(id), FindOptions::default())
            .await?
            .map(Book::from_document)
            .transpose()
            .map_err(BookError::from)
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Book>, BookError> {
        let docs = self
            .books
            .find(&params.filter(), &FindOptions::default())
            .await
            .map_err(BookError::SearchFailed)?;
        decode_all(docs)
    }

    /// Store a new book under the next sequential id.
    pub async fn create(&self, input: BookInput) -> Result<Book, BookError> {
        let draft = BookDraft::from_input(input, current_year())?;
        let id = next_id(&self.books).await?;
        let book = draft.with_id(id);

        self.books.insert_one(book.to_document()).await?;
        tracing::info!(id = book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Replace the book at `raw_id`, creating it with exactly that id if absent.
    pub async fn upsert(&self, raw_id: &str, input: BookInput) -> Result<Upserted, BookError> {
        let id = parse_id(raw_id)?;
        if let Some(body_id) = input.id.filter(|body_id| *body_id != id) {
            return Err(ValidationError::IdMismatch { path: id, body: body_id }.into());
        }

        let book = BookDraft::from_input(input, current_year())?.with_id(id);
        let outcome = self.books.replace_one(id, book.to_document(), true).await?;

        tracing::info!(id, created = outcome.upserted, "book upserted");
        Ok(Upserted {
            book,
            created: outcome.upserted,
        })
    }

    /// Delete the book at `raw_id`. Returns `false` when nothing was removed.
    pub async fn remove(&self, raw_id: &str) -> Result<bool, BookError> {
        let id: BookId = parse_id(raw_id)?;
        let deleted = self.books.delete_one(id).await?;
        tracing::info!(id, deleted, "book delete requested");
        Ok(deleted > 0)
    }
}
