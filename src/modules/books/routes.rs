//! HTTP handlers for `/books`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use bookshelf_authz::TokenService;
use bookshelf_http::error::AppError;
use serde::Serialize;

use super::error::{BookError, ValidationError};
use super::models::{Book, BookInput};
use super::query::{ListParams, SearchParams};
use super::service::BookService;
use crate::modules::auth::Authenticated;

/// State shared by the books handlers.
#[derive(Clone)]
pub struct BooksState {
    pub service: BookService,
    pub tokens: Arc<TokenService>,
}

impl FromRef<BooksState> for Arc<TokenService> {
    fn from_ref(state: &BooksState) -> Self {
        state.tokens.clone()
    }
}

/// Success body shared by every books endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: &'static str,
    pub data: T,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

fn respond<T>(message: &'static str, data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse { message, data }))
}

fn listing(books: Vec<Book>) -> ApiResult<Vec<Book>> {
    if books.is_empty() {
        respond("No documents found", books)
    } else {
        respond("Documents fetched", books)
    }
}

fn body(payload: Result<Json<BookInput>, JsonRejection>) -> Result<BookInput, BookError> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()).into())
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, BookError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ValidationError::MalformedQuery(rejection.body_text()).into())
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route("/{id}", get(get_book).put(upsert_book).delete(delete_book))
        .with_state(state)
}

async fn list_books(
    _auth: Authenticated,
    State(state): State<BooksState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<Book>> {
    let params = query_params(params)?;
    listing(state.service.list(&params).await?)
}

async fn search_books(
    _auth: Authenticated,
    State(state): State<BooksState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<Book>> {
    let params = query_params(params)?;
    listing(state.service.search(&params).await?)
}

async fn get_book(
    _auth: Authenticated,
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> ApiResult<Option<Book>> {
    match state.service.get(&id).await? {
        Some(book) => respond("Document fetched", Some(book)),
        None => respond("No document found", None),
    }
}

async fn create_book(
    _auth: Authenticated,
    State(state): State<BooksState>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<Book> {
    let input = body(payload)?;
    respond("Document created", state.service.create(input).await?)
}

async fn upsert_book(
    _auth: Authenticated,
    State(state): State<BooksState>,
    Path(id): Path<String>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<Book> {
    let input = body(payload)?;
    let upserted = state.service.upsert(&id, input).await?;
    let message = if upserted.created {
        "Document created"
    } else {
        "Document updated"
    };
    respond(message, upserted.book)
}

async fn delete_book(
    _auth: Authenticated,
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    if state.service.remove(&id).await? {
        respond("Document deleted", serde_json::json!({ "deleted": true }))
    } else {
        Err(AppError::not_found(format!("no book with id {}", id.trim())))
    }
}
