use bookshelf_db::StoreError;
use bookshelf_http::error::AppError;
use serde_json::json;
use thiserror::Error;

use super::models::BookId;

/// Request input the books API refuses before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a valid book id")]
    InvalidId(String),

    #[error("cannot sort by '{0}'; expected one of title, authors, description, publicationYear")]
    InvalidSortField(String),

    #[error("sort order '{0}' is invalid; expected 1 or -1")]
    InvalidSortOrder(String),

    #[error("{field} must be an integer, got '{value}'")]
    InvalidPagination { field: &'static str, value: String },

    #[error("missing required field '{0}'")]
    MissingRequiredField(&'static str),

    #[error("field '{field}' {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("body id {body} does not match path id {path}")]
    IdMismatch { path: BookId, body: BookId },

    #[error("request body is malformed: {0}")]
    MalformedBody(String),

    #[error("query string is malformed: {0}")]
    MalformedQuery(String),
}

impl ValidationError {
    /// Name of the offending parameter or field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidId(_) | Self::IdMismatch { .. } => "id",
            Self::InvalidSortField(_) => "sort",
            Self::InvalidSortOrder(_) => "order",
            Self::InvalidPagination { field, .. } => *field,
            Self::MissingRequiredField(field) => *field,
            Self::InvalidField { field, .. } => *field,
            Self::MalformedBody(_) => "body",
            Self::MalformedQuery(_) => "query",
        }
    }
}

#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("search failed: {0}")]
    SearchFailed(#[source] StoreError),

    #[error("no book id left to allocate")]
    IdSpaceExhausted,

    #[error("stored book is malformed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        AppError::validation(
            vec![json!({"field": err.field(), "error": message})],
            message,
        )
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(v) => v.into(),
            BookError::SearchFailed(e) => AppError::not_found(format!("search failed: {e}")),
            BookError::Store(StoreError::DocumentValidation(reason)) => AppError::validation(
                vec![json!({"field": "body", "error": reason})],
                "document rejected by collection validator",
            ),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn validation_errors_map_to_forbidden() {
        let err: AppError = BookError::from(ValidationError::InvalidSortField("x".into())).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_failures_map_to_internal_error() {
        let err: AppError = BookError::Store(StoreError::Closed).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: AppError = BookError::SearchFailed(StoreError::Closed).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: AppError = BookError::IdSpaceExhausted.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_validation_is_reported_as_rejected_input() {
        let err: AppError =
            BookError::Store(StoreError::DocumentValidation("bad year".into())).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
