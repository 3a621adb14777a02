use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use super::{Credentials, IdentityProvider, ProviderError, ProviderUser};
use crate::config::ProviderConfig;

/// HTTP client for the provider's `/auth/v1` API
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    auth_base: Url,
    api_key: String,
}

impl GoTrueClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let auth_base = Url::parse(&format!("{}/auth/v1/", config.url.trim_end_matches('/')))
            .map_err(|e| ProviderError::Config(format!("provider url '{}': {}", config.url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            auth_base,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.auth_base
            .join(path)
            .map_err(|e| ProviderError::Config(format!("endpoint '{}': {}", path, e)))
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Response, ProviderError> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url.path());
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        Ok(response)
    }
}

async fn read_json(response: Response) -> Result<Value, ProviderError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Turn a refused response into an error, keeping the body for logs
async fn rejected(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    warn!("Provider rejected request: {} {}", status, body);
    ProviderError::Rejected { status, body }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Value, ProviderError> {
        let response = self
            .post_json(
                "token?grant_type=password",
                json!({"email": credentials.email, "password": credentials.password}),
            )
            .await?;

        if response.status() != StatusCode::OK {
            return Err(rejected(response).await);
        }
        read_json(response).await
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Value, ProviderError> {
        let response = self
            .post_json(
                "signup",
                json!({"email": credentials.email, "password": credentials.password}),
            )
            .await?;

        if response.status().as_u16() >= 400 {
            return Err(rejected(response).await);
        }
        read_json(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, ProviderError> {
        let response = self
            .post_json("token?grant_type=refresh_token", json!({"refresh_token": refresh_token}))
            .await?;

        if response.status() != StatusCode::OK {
            return Err(rejected(response).await);
        }
        read_json(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.endpoint("logout")?)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<ProviderUser, ProviderError> {
        let response = self
            .http
            .get(self.endpoint("user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(rejected(response).await);
        }
        response
            .json::<ProviderUser>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;

    /// Minimal stand-in for the provider's auth API
    async fn spawn_fake_provider() -> String {
        async fn token(
            headers: HeaderMap,
            Query(params): Query<HashMap<String, String>>,
            Json(body): Json<Value>,
        ) -> (AxumStatus, Json<Value>) {
            if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("anon") {
                return (AxumStatus::UNAUTHORIZED, Json(json!({"msg": "no apikey"})));
            }
            match (params.get("grant_type").map(String::as_str), body["password"].as_str()) {
                (Some("password"), Some("right")) => (
                    AxumStatus::OK,
                    Json(json!({"access_token": "a", "refresh_token": "r", "expires_in": 3600})),
                ),
                (Some("refresh_token"), _) if body["refresh_token"] == "r" => (
                    AxumStatus::OK,
                    Json(json!({"access_token": "a2", "refresh_token": "r2", "expires_in": 3600})),
                ),
                _ => (AxumStatus::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))),
            }
        }

        async fn signup(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
            if body["email"] == "taken@example.com" {
                return (AxumStatus::UNPROCESSABLE_ENTITY, Json(json!({"msg": "already registered"})));
            }
            (AxumStatus::OK, Json(json!({"id": "new-user", "email": body["email"]})))
        }

        async fn user(headers: HeaderMap) -> (AxumStatus, Json<Value>) {
            match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer a") => (AxumStatus::OK, Json(json!({"id": "u1", "email": "a@b.io"}))),
                _ => (AxumStatus::UNAUTHORIZED, Json(json!({"msg": "bad jwt"}))),
            }
        }

        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/logout", post(|| async { AxumStatus::NO_CONTENT }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(url: String) -> GoTrueClient {
        GoTrueClient::new(&ProviderConfig {
            url,
            api_key: "anon".to_string(),
            jwt_secret: None,
            jwt_audience: "authenticated".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn login_passes_payload_through_and_maps_rejection() {
        let client = client_for(spawn_fake_provider().await);

        let ok = client
            .sign_in_with_password(&Credentials::new("a@b.io", "right"))
            .await
            .unwrap();
        assert_eq!(ok["refresh_token"], "r");

        let err = client
            .sign_in_with_password(&Credentials::new("a@b.io", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn signup_and_refresh() {
        let client = client_for(spawn_fake_provider().await);

        let created = client.sign_up(&Credentials::new("new@example.com", "pw")).await.unwrap();
        assert_eq!(created["id"], "new-user");

        let taken = client.sign_up(&Credentials::new("taken@example.com", "pw")).await;
        assert!(matches!(taken, Err(ProviderError::Rejected { status: 422, .. })));

        let refreshed = client.refresh_session("r").await.unwrap();
        assert_eq!(refreshed["access_token"], "a2");
    }

    #[tokio::test]
    async fn user_lookup_and_logout() {
        let client = client_for(spawn_fake_provider().await);

        assert_eq!(client.get_user("a").await.unwrap().id, "u1");
        assert!(matches!(
            client.get_user("forged").await,
            Err(ProviderError::Rejected { status: 401, .. })
        ));
        assert!(client.sign_out("a").await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        let port = portpicker::pick_unused_port().expect("free port");
        let client = client_for(format!("http://127.0.0.1:{}", port));
        let err = client.sign_in_with_password(&Credentials::new("a@b.io", "pw")).await;
        assert!(matches!(err, Err(ProviderError::Transport(_))));
    }

    #[test]
    fn endpoints_live_under_auth_v1() {
        let client = client_for("https://auth.example.com/".to_string());
        assert_eq!(
            client.endpoint("token?grant_type=password").unwrap().as_str(),
            "https://auth.example.com/auth/v1/token?grant_type=password"
        );
    }
}
