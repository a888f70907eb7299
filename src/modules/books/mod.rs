pub mod error;
pub mod ids;
pub mod models;
pub mod query;
pub mod routes;
pub mod schema;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use bookshelf_authz::TokenService;
use bookshelf_kernel::{InitCtx, Module};
use once_cell::sync::OnceCell;
use serde_json::json;

use routes::BooksState;
use service::BookService;

/// Books module: owns the books collection and serves `/books`.
///
/// Routes only exist once [`Module::init`] has ensured the collection.
pub struct BooksModule {
    tokens: Arc<TokenService>,
    state: OnceCell<BooksState>,
}

impl BooksModule {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            tokens,
            state: OnceCell::new(),
        }
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn ok_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" },
                        "data": schema
                    },
                    "required": ["message", "data"]
                }
            }
        }
    })
}

fn id_parameter() -> serde_json::Value {
    json!({ "name": "id", "in": "path", "required": true, "schema": { "type": "integer", "minimum": 0 } })
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn mount_path(&self) -> Option<&'static str> {
        Some("/books")
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let collection_name = &ctx.settings.database.collection;
        let books = schema::ensure_books_collection(ctx.store.clone(), collection_name)
            .await
            .with_context(|| format!("failed to ensure collection '{}'", collection_name))?;

        self.state
            .set(BooksState {
                service: BookService::new(books),
                tokens: self.tokens.clone(),
            })
            .map_err(|_| anyhow::anyhow!("books module initialized twice"))?;

        tracing::info!(
            module = self.name(),
            collection = %collection_name,
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.state.get() {
            Some(state) => routes::router(state.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init; none mounted");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let book_ref = json!({ "$ref": "#/components/schemas/Book" });
        let book_list = json!({ "type": "array", "items": book_ref });
        let book_body = json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/BookInput" } }
            }
        });
        let security = json!([{ "token": [] }]);
        let unauthorized = error_response("Missing, invalid or expired token");
        let store_failure = error_response("Store failure");

        let list_parameters = json!([
            { "name": "offset", "in": "query", "schema": { "type": "integer" } },
            { "name": "limit", "in": "query", "schema": { "type": "integer" } },
            { "name": "sort", "in": "query", "schema": { "type": "string", "enum": query::SORTABLE_FIELDS } },
            { "name": "order", "in": "query", "schema": { "type": "integer", "enum": [1, -1] } }
        ]);
        let list = json!({
            "summary": "List books",
            "tags": ["Books"],
            "security": security,
            "parameters": list_parameters,
            "responses": {
                "200": ok_response("Page of books, possibly empty", book_list.clone()),
                "401": unauthorized,
                "403": error_response("Invalid pagination, sort or order")
            }
        });
        let create = json!({
            "summary": "Create a book",
            "tags": ["Books"],
            "security": security,
            "requestBody": book_body,
            "responses": {
                "200": ok_response("Created book", book_ref.clone()),
                "401": unauthorized,
                "403": error_response("Missing required fields or bad format")
            }
        });
        let search = json!({
            "summary": "Full-text search over title, authors and description",
            "tags": ["Books"],
            "security": security,
            "parameters": [{ "name": "query", "in": "query", "schema": { "type": "string" } }],
            "responses": {
                "200": ok_response("Matching books ranked by relevance", book_list),
                "401": unauthorized,
                "404": error_response("Search failed")
            }
        });
        let fetch = json!({
            "summary": "Fetch a book by id",
            "tags": ["Books"],
            "security": security,
            "parameters": [id_parameter()],
            "responses": {
                "200": ok_response("The book, or null when absent", book_ref.clone()),
                "401": unauthorized,
                "403": error_response("Malformed id"),
                "500": store_failure
            }
        });
        let upsert = json!({
            "summary": "Replace a book, creating it with this id if absent",
            "tags": ["Books"],
            "security": security,
            "parameters": [id_parameter()],
            "requestBody": book_body,
            "responses": {
                "200": ok_response("Stored book", book_ref),
                "401": unauthorized,
                "403": error_response("Malformed id or missing required fields"),
                "500": store_failure
            }
        });
        let delete = json!({
            "summary": "Delete a book",
            "tags": ["Books"],
            "security": security,
            "parameters": [id_parameter()],
            "responses": {
                "200": ok_response("Deleted", json!({ "type": "object" })),
                "401": unauthorized,
                "403": error_response("Malformed id"),
                "404": error_response("No book with this id"),
                "500": store_failure
            }
        });

        let book_properties = json!({
            "id": { "type": "integer", "minimum": 0 },
            "title": { "type": "string" },
            "authors": { "type": "array", "items": { "type": "string" } },
            "description": { "type": "string" },
            "publicationYear": { "type": "integer", "minimum": schema::MIN_PUBLICATION_YEAR }
        });

        Some(json!({
            "paths": {
                "/": { "get": list, "post": create },
                "/search": { "get": search },
                "/{id}": { "get": fetch, "put": upsert, "delete": delete }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": book_properties,
                        "required": ["id", "title", "authors"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": book_properties,
                        "required": ["title", "authors"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(tokens: Arc<TokenService>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(tokens))
}
