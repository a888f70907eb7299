use thiserror::Error;

/// Failures raised by a document store engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    #[error("collection '{0}' has no text index")]
    TextIndexMissing(String),

    #[error("'{0}' is not a valid collection or field name")]
    InvalidName(String),

    #[error("document failed validation: {0}")]
    DocumentValidation(String),

    #[error("duplicate key: id {0} already exists")]
    DuplicateKey(i64),

    #[error("store is closed")]
    Closed,

    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
