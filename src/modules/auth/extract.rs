use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use bookshelf_authz::{AuthError, TokenService};
use bookshelf_http::error::AppError;

/// Caller whose bearer token was verified.
///
/// The `Authorization` header carries the raw token; a `Bearer ` prefix is
/// tolerated.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub role: String,
}

/// Map a token failure to its HTTP error.
pub fn auth_error(err: AuthError) -> AppError {
    match err {
        AuthError::MissingToken => AppError::unauthorized("missing_token", err.to_string()),
        AuthError::InvalidOrExpiredToken => {
            AppError::unauthorized("invalid_or_expired_token", err.to_string())
        }
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);

        let token = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                auth_error(AuthError::InvalidOrExpiredToken)
            })?),
            None => None,
        };
        let token = token.map(|t| t.strip_prefix("Bearer ").unwrap_or(t));

        let claims = tokens.verify(token).map_err(auth_error)?;
        Ok(Authenticated { role: claims.role })
    }
}
