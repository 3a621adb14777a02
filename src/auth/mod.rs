use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::provider::{IdentityProvider, ProviderError};

/// Clock skew tolerance for `exp`/`nbf`, in seconds
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims carried by the provider's access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, email: Option<String>, audience: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            email,
            role: Some("authenticated".to_string()),
            aud: Some(serde_json::Value::String(audience.to_string())),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Sign claims with a shared HS256 secret, the way the provider does
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Internal("JWT secret not configured".to_string()));
    }
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::Internal(format!("JWT generation error: {}", e)))
}

/// Verified identity of the caller, scoped to one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Raw bearer token of the current request, for calls made on the caller's behalf
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must use Bearer token format")]
    InvalidHeader,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token audience is invalid")]
    InvalidAudience,

    #[error("Token was rejected by the identity provider")]
    Rejected,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

enum Verifier {
    Local {
        key: DecodingKey,
        validation: Validation,
    },
    Remote(Arc<dyn IdentityProvider>),
}

/// Verifies bearer tokens, locally when a JWT secret is configured,
/// otherwise by asking the provider who the token belongs to.
pub struct Authenticator {
    verifier: Verifier,
}

impl Authenticator {
    pub fn new(config: &ProviderConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        match config.jwt_secret.as_deref() {
            Some(secret) => Self::local(secret, &config.jwt_audience),
            None => Self {
                verifier: Verifier::Remote(provider),
            },
        }
    }

    pub fn local(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_audience(&[audience]);
        Self {
            verifier: Verifier::Local {
                key: DecodingKey::from_secret(secret.as_bytes()),
                validation,
            },
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.verifier, Verifier::Local { .. })
    }

    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        match &self.verifier {
            Verifier::Local { key, validation } => {
                let data = decode::<Claims>(token, key, validation).map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                    ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                    _ => AuthError::MalformedToken,
                })?;
                Ok(AuthUser::from(data.claims))
            }
            Verifier::Remote(provider) => match provider.get_user(token).await {
                Ok(user) => Ok(AuthUser {
                    user_id: user.id,
                    email: user.email,
                    role: user.role,
                }),
                Err(ProviderError::Rejected { status, .. }) => {
                    debug!("Provider refused token with status {}", status);
                    Err(AuthError::Rejected)
                }
                Err(e) => Err(AuthError::ProviderUnavailable(e.to_string())),
            },
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingHeader)?;
    let token = value.strip_prefix("Bearer ").ok_or(AuthError::InvalidHeader)?.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidHeader);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[tokio::test]
    async fn local_verification_yields_subject() {
        let auth = Authenticator::local(SECRET, "authenticated");
        let claims = Claims::new("user-1", Some("a@b.io".to_string()), "authenticated", Duration::hours(1));
        let token = issue_token(&claims, SECRET).unwrap();

        let user = auth.verify(&token).await.unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.email.as_deref(), Some("a@b.io"));
    }

    #[tokio::test]
    async fn expired_beyond_leeway_is_rejected() {
        let auth = Authenticator::local(SECRET, "authenticated");
        let claims = Claims::new("user-1", None, "authenticated", Duration::seconds(-120));
        let token = issue_token(&claims, SECRET).unwrap();
        assert!(matches!(auth.verify(&token).await, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn wrong_secret_and_audience_are_rejected() {
        let auth = Authenticator::local(SECRET, "authenticated");

        let forged = issue_token(&Claims::new("u", None, "authenticated", Duration::hours(1)), "other").unwrap();
        assert!(matches!(auth.verify(&forged).await, Err(AuthError::InvalidSignature)));

        let foreign = issue_token(&Claims::new("u", None, "service", Duration::hours(1)), SECRET).unwrap();
        assert!(matches!(auth.verify(&foreign).await, Err(AuthError::InvalidAudience)));

        assert!(matches!(auth.verify("not.a.jwt").await, Err(AuthError::MalformedToken)));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingHeader)));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::InvalidHeader)));
        assert!(matches!(bearer_token(Some("Bearer   ")), Err(AuthError::InvalidHeader)));
    }
}
