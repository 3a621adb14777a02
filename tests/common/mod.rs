#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use journal_backend::auth::{issue_token, Claims};
use journal_backend::config::AppConfig;
use journal_backend::database::{MemoryStore, Store};
use journal_backend::provider::{Credentials, IdentityProvider, ProviderError, ProviderUser};
use journal_backend::{app, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const AUDIENCE: &str = "authenticated";

/// In-process stand-in for the identity provider
#[derive(Default)]
pub struct FakeProvider {
    inner: Mutex<FakeProviderState>,
}

#[derive(Default)]
struct FakeProviderState {
    /// email -> (user id, password)
    accounts: HashMap<String, (String, String)>,
    /// refresh token -> email
    refresh_tokens: HashMap<String, String>,
    /// access token -> user, for remote verification
    access_tokens: HashMap<String, ProviderUser>,
    signed_out: Vec<String>,
}

impl FakeProvider {
    fn rejected(status: u16, message: &str) -> ProviderError {
        ProviderError::Rejected {
            status,
            body: json!({ "error": "invalid_grant", "error_description": message }),
        }
    }

    fn session_for(state: &mut FakeProviderState, email: &str) -> Result<Value, ProviderError> {
        let (user_id, _) = state
            .accounts
            .get(email)
            .cloned()
            .ok_or_else(|| Self::rejected(400, "unknown user"))?;

        let claims = Claims::new(&user_id, Some(email.to_string()), AUDIENCE, Duration::hours(1));
        let access_token =
            issue_token(&claims, JWT_SECRET).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let refresh_token = format!("refresh-{}", uuid::Uuid::new_v4());

        state.refresh_tokens.insert(refresh_token.clone(), email.to_string());
        state.access_tokens.insert(
            access_token.clone(),
            ProviderUser {
                id: user_id.clone(),
                email: Some(email.to_string()),
                role: Some("authenticated".to_string()),
            },
        );

        Ok(json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": user_id, "email": email }
        }))
    }

    pub fn signed_out(&self) -> Vec<String> {
        self.inner.lock().unwrap().signed_out.clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Value, ProviderError> {
        let mut state = self.inner.lock().unwrap();
        let valid = matches!(
            state.accounts.get(&credentials.email),
            Some((_, password)) if *password == credentials.password
        );
        if !valid {
            return Err(Self::rejected(400, "Invalid login credentials"));
        }
        Self::session_for(&mut state, &credentials.email)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Value, ProviderError> {
        let mut state = self.inner.lock().unwrap();
        if state.accounts.contains_key(&credentials.email) {
            return Err(Self::rejected(422, "User already registered"));
        }
        let user_id = uuid::Uuid::new_v4().to_string();
        state
            .accounts
            .insert(credentials.email.clone(), (user_id.clone(), credentials.password.clone()));
        Ok(json!({ "id": user_id, "email": credentials.email }))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, ProviderError> {
        let mut state = self.inner.lock().unwrap();
        let email = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| Self::rejected(400, "Invalid Refresh Token"))?;
        Self::session_for(&mut state, &email)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();
        state.access_tokens.remove(access_token);
        state.signed_out.push(access_token.to_string());
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, ProviderError> {
        let state = self.inner.lock().unwrap();
        state
            .access_tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| Self::rejected(401, "invalid JWT"))
    }
}

/// Router served on an ephemeral port, backed by the memory store and the fake provider
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
    client: reqwest::Client,
    server: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Tokens verified locally with the shared secret
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        config.provider.jwt_secret = Some(JWT_SECRET.to_string());
        Self::spawn_with(config).await
    }

    /// Tokens verified by asking the provider
    pub async fn spawn_remote() -> Result<Self> {
        let mut config = AppConfig::development();
        config.provider.jwt_secret = None;
        Self::spawn_with(config).await
    }

    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::default());
        let state = AppState::new(config, store.clone() as Arc<dyn Store>, provider.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            store,
            provider,
            client: reqwest::Client::new(),
            server,
        })
    }

    /// Locally-verifiable token for `user_id`
    pub fn token_for(&self, user_id: &str) -> String {
        let claims = Claims::new(user_id, Some(format!("{}@example.com", user_id)), AUDIENCE, Duration::hours(1));
        issue_token(&claims, JWT_SECRET).expect("failed to issue test token")
    }

    /// Send a request and return status plus parsed body (`Null` when empty)
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))?
        };
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, token, Some(body)).await
    }

    /// POST a raw, possibly malformed, JSON body
    pub async fn post_raw(&self, path: &str, token: Option<&str>, raw: &str) -> Result<(StatusCode, Value)> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(raw.to_string());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let res = request.send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Minimal valid bundle with `prekeys` one-time pre-keys numbered from 1
pub fn sample_bundle(prekeys: i32) -> Value {
    let one_time: Vec<Value> = (1..=prekeys)
        .map(|id| json!({ "keyId": id, "publicKey": format!("opk-{}", id) }))
        .collect();
    json!({
        "registrationId": 4242,
        "deviceId": 1,
        "identityKeyPublic": "identity-public",
        "signedPreKey": { "keyId": 7, "publicKey": "spk-public", "signature": "spk-signature" },
        "oneTimePreKeys": one_time
    })
}
