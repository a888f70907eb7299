//! Token issuance route and the bearer-token extractor used by other modules.

mod extract;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use bookshelf_authz::{IssuedToken, TokenService};
use bookshelf_http::error::AppError;
use bookshelf_kernel::{InitCtx, Module};
use serde::{Deserialize, Serialize};

pub use extract::{auth_error, Authenticated};

/// Serves `GET /createAuthToken`.
pub struct AuthModule {
    tokens: Arc<TokenService>,
}

impl AuthModule {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[derive(Debug, Deserialize)]
struct TokenParams {
    role: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    message: &'static str,
    #[serde(flatten)]
    token: IssuedToken,
}

async fn create_auth_token(
    State(tokens): State<Arc<TokenService>>,
    Query(params): Query<TokenParams>,
) -> Result<Json<TokenResponse>, AppError> {
    let role = params
        .role
        .filter(|role| !role.trim().is_empty())
        .ok_or_else(|| AppError::not_found("a role query parameter is required"))?;

    let token = tokens.issue(&role).map_err(auth_error)?;
    tracing::info!(role = %role, expires_at = %token.expires_at, "auth token issued");

    Ok(Json(TokenResponse {
        message: "Token created",
        token,
    }))
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn mount_path(&self) -> Option<&'static str> {
        Some("/")
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            ttl_hours = ctx.settings.auth.token_ttl_hours,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/createAuthToken", get(create_auth_token))
            .with_state(self.tokens.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/createAuthToken": {
                    "get": {
                        "summary": "Issue a bearer token for a role",
                        "tags": ["Auth"],
                        "parameters": [{
                            "name": "role",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Signed token valid for the configured window",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/AuthToken" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Missing role",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "AuthToken": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "token": { "type": "string" },
                            "role": { "type": "string" },
                            "expiresAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["message", "token", "role", "expiresAt"]
                    }
                }
            }
        }))
    }
}
