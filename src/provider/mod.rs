//! Client side of the external identity provider (a GoTrue-style auth API)

pub mod client;
pub mod refresh;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::database::models::ValidationError;

pub use client::GoTrueClient;
pub use refresh::{run_auto_refresh, RefreshPolicy, SessionRefresher};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered, but refused the request
    #[error("Provider rejected request with status {status}")]
    Rejected { status: u16, body: Value },

    #[error("Provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email".to_string()));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(ValidationError::invalid("email", "invalid email format")),
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password".to_string()));
        }
        Ok(())
    }
}

/// The provider's view of a user, as returned by `GET /auth/v1/user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// The parts of a session payload the refresh loop needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: u64,
}

impl SessionTokens {
    pub fn from_payload(payload: &Value) -> Result<Self, ProviderError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| ProviderError::InvalidResponse(format!("session payload: {}", e)))
    }
}

/// Subject of the user created by a signup. The provider returns either the
/// user object itself or a session that wraps it.
pub fn signup_user_id(payload: &Value) -> Option<&str> {
    payload
        .get("user")
        .and_then(|user| user.get("id"))
        .or_else(|| payload.get("id"))
        .and_then(Value::as_str)
}

/// Operations the server forwards to the identity provider.
///
/// Payloads from sign-in, sign-up and refresh are passed through to clients
/// unchanged, so they are returned as raw JSON.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Value, ProviderError>;

    async fn sign_up(&self, credentials: &Credentials) -> Result<Value, ProviderError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, ProviderError>;

    /// Revoke the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, ProviderError>;
}
