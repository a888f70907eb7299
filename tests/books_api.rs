use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bookshelf_app::app::init_modules;
use bookshelf_authz::TokenService;
use bookshelf_db::{DocumentStore, MemoryStore, SqliteStore};
use bookshelf_kernel::settings::Settings;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

async fn app() -> (Router, String) {
    app_with(Arc::new(MemoryStore::new())).await
}

async fn app_with(store: Arc<dyn DocumentStore>) -> (Router, String) {
    let settings = Settings::default();
    let tokens = Arc::new(TokenService::new(SECRET, 12).unwrap());
    let registry = init_modules(&settings, store, tokens.clone())
        .await
        .unwrap_or_else(|err| panic!("module init failed: {err:#}"));

    let token = tokens.issue("admin").unwrap().token;
    (bookshelf_http::build_router(&registry, &settings), token)
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap_or_else(|err| panic!("failed to build request: {err}"));

    let response = router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|err| panic!("router request failed: {err}"));
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_auth_token_requires_role() {
    let (router, _) = app().await;

    let (status, body) = send(&router, "GET", "/createAuthToken", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = send(&router, "GET", "/createAuthToken?role=editor", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "editor");

    let verifier = TokenService::new(SECRET, 12).unwrap();
    let claims = verifier.verify(body["token"].as_str()).unwrap();
    assert_eq!(claims.role, "editor");
}

#[tokio::test]
async fn book_routes_require_a_valid_token() {
    let (router, _) = app().await;

    let (status, body) = send(&router, "GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "missing_token");

    let (status, body) = send(&router, "GET", "/books", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_or_expired_token");

    let (status, _) = send(&router, "POST", "/books", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_listing_is_a_success() {
    let (router, token) = app().await;
    let (status, body) = send(&router, "GET", "/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No documents found");
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn create_then_fetch_by_id() {
    let (router, token) = app().await;

    let (status, body) = send(
        &router,
        "POST",
        "/books",
        Some(&token),
        Some(json!({"title": "Pair", "authors": ["Bravo", "Alpha"], "publicationYear": 1999})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 0);
    assert_eq!(body["data"]["authors"], json!(["Alpha", "Bravo"]));
    assert!(body["data"].get("description").is_none());

    let (status, body) = send(&router, "GET", "/books/0", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Document fetched");
    assert_eq!(body["data"]["title"], "Pair");

    let (status, body) = send(&router, "GET", "/books/7", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No document found");
    assert!(body["data"].is_null());

    let (status, _) = send(&router, "GET", "/books/seven", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_rejects_missing_fields_and_bad_format() {
    let (router, token) = app().await;

    let (status, body) = send(
        &router,
        "POST",
        "/books",
        Some(&token),
        Some(json!({"title": "No authors"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"][0]["field"], "authors");

    let (status, _) = send(
        &router,
        "POST",
        "/books",
        Some(&token),
        Some(json!({"title": 12, "authors": ["A"]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_pages_and_validates_sort() {
    let (router, token) = app().await;
    for n in 0..12 {
        let (status, _) = send(
            &router,
            "POST",
            "/books",
            Some(&token),
            Some(json!({"title": format!("Book {n:02}"), "authors": ["Author"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&router, "GET", "/books?offset=2&limit=5", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Documents fetched");
    assert_eq!(ids(&body), vec![5, 6, 7, 8, 9]);

    let (status, body) = send(&router, "GET", "/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body).len(), 10);

    let (status, body) = send(&router, "GET", "/books?sort=title&order=-1&limit=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![11, 10]);

    let (status, body) = send(&router, "GET", "/books?sort=bogusField", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"][0]["field"], "sort");

    let (status, _) = send(&router, "GET", "/books?sort=title&order=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_query_strings_get_the_json_error_envelope() {
    let (router, token) = app().await;

    let (status, body) = send(&router, "GET", "/books?offset=1&offset=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"][0]["field"], "query");

    let (status, body) = send(
        &router,
        "GET",
        "/books/search?query=a&query=b",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"][0]["field"], "query");
}

#[tokio::test]
async fn create_after_highest_possible_id_is_an_internal_error() {
    let (router, token) = app().await;
    let uri = format!("/books/{}", i64::MAX);
    let (status, _) = send(
        &router,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({"title": "Last", "authors": ["A"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        "POST",
        "/books",
        Some(&token),
        Some(json!({"title": "Overflow", "authors": ["B"]})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_object());
}

#[tokio::test]
async fn sqlite_store_serves_crud_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("bookshelf.db")).await.unwrap();
    let (router, token) = app_with(Arc::new(store)).await;

    for (title, authors) in [("Dune", ["Frank Herbert"]), ("Emma", ["Jane Austen"])] {
        let (status, _) = send(
            &router,
            "POST",
            "/books",
            Some(&token),
            Some(json!({"title": title, "authors": authors})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&router, "GET", "/books?sort=title&order=-1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1, 0]);

    let (status, body) = send(&router, "GET", "/books/search?query=austen", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1]);

    let (status, _) = send(&router, "DELETE", "/books/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&router, "GET", "/books/search?query=austen", Some(&token), None).await;
    assert_eq!(body["message"], "No documents found");
}

#[tokio::test]
async fn search_matches_text_and_empty_query_returns_nothing() {
    let (router, token) = app().await;
    send(
        &router,
        "POST",
        "/books",
        Some(&token),
        Some(json!({"title": "Dune", "authors": ["Frank Herbert"], "description": "Desert planet"})),
    )
    .await;

    let (status, body) = send(&router, "GET", "/books/search?query=herbert", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![0]);

    let (status, body) = send(&router, "GET", "/books/search", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No documents found");
}

#[tokio::test]
async fn upsert_and_delete() {
    let (router, token) = app().await;

    let (status, body) = send(
        &router,
        "PUT",
        "/books/5",
        Some(&token),
        Some(json!({"title": "Placed", "authors": ["Zed", "Amy"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Document created");
    assert_eq!(body["data"]["id"], 5);
    assert_eq!(body["data"]["authors"], json!(["Amy", "Zed"]));

    let (status, body) = send(
        &router,
        "PUT",
        "/books/5",
        Some(&token),
        Some(json!({"title": "Moved"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"][0]["field"], "authors");

    let (status, body) = send(
        &router,
        "PUT",
        "/books/5",
        Some(&token),
        Some(json!({"title": "Renamed", "authors": ["Amy"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Document updated");

    let (status, _) = send(&router, "DELETE", "/books/99", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "DELETE", "/books/x", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, "DELETE", "/books/5", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Document deleted");

    let (_, body) = send(&router, "GET", "/books/5", Some(&token), None).await;
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let (router, _) = app().await;

    let response = router
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, spec) = send(&router, "GET", "/docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/books"]["get"].is_object());
    assert!(spec["paths"]["/books/{id}"]["delete"].is_object());
    assert!(spec["paths"]["/createAuthToken"]["get"].is_object());
}
