//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying a `role` claim. They are stateless: the
//! only way a token stops working is its expiry passing.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validity window applied when no other is configured.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub role: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration time (unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authentication token supplied")]
    MissingToken,

    #[error("authentication token is invalid or expired")]
    InvalidOrExpiredToken,

    #[error("token secret must not be empty")]
    EmptySecret,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// A freshly signed token and when it stops being accepted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        })
    }

    pub fn issue(&self, role: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, role: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        tracing::debug!(target: "bookshelf-authz", role, %expires_at, "token issued");

        Ok(IssuedToken {
            token,
            role: claims.role,
            expires_at,
        })
    }

    /// Check a presented token and return its claims.
    pub fn verify(&self, token: Option<&str>) -> Result<Claims, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(target: "bookshelf-authz", error = %e, "token rejected");
                AuthError::InvalidOrExpiredToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test_secret_key_12345", DEFAULT_TOKEN_TTL_HOURS).unwrap()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let svc = service();
        let issued = svc.issue("admin").unwrap();
        let claims = svc.verify(Some(&issued.token)).unwrap();

        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[test]
    fn test_token_accepted_just_before_expiry() {
        let svc = service();
        let issued = svc
            .issue_at("reader", Utc::now() - Duration::hours(11))
            .unwrap();
        assert_eq!(svc.verify(Some(&issued.token)).unwrap().role, "reader");
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let issued = svc
            .issue_at("admin", Utc::now() - Duration::hours(13))
            .unwrap();
        assert!(matches!(
            svc.verify(Some(&issued.token)),
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let token = svc.issue("admin").unwrap().token;
        let (unsigned, signature) = token.rsplit_once('.').unwrap();
        let first = signature.chars().next().unwrap();
        let swapped = if first == 'A' { 'B' } else { 'A' };
        let token = format!("{unsigned}.{swapped}{}", &signature[1..]);

        assert!(matches!(
            svc.verify(Some(&token)),
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue("admin").unwrap().token;
        let other = TokenService::new("another_secret", DEFAULT_TOKEN_TTL_HOURS).unwrap();
        assert!(other.verify(Some(&token)).is_err());
    }

    #[test]
    fn test_missing_token() {
        let svc = service();
        assert!(matches!(svc.verify(None), Err(AuthError::MissingToken)));
        assert!(matches!(svc.verify(Some("  ")), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_empty_secret_refused() {
        assert!(matches!(
            TokenService::new("", DEFAULT_TOKEN_TTL_HOURS),
            Err(AuthError::EmptySecret)
        ));
    }
}
