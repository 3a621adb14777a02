use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use url::Url;

use crate::provider::{ProviderError, SessionRefresher, SessionTokens};

/// Thin HTTP client over the Journal Backend API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, token: Option<String>) -> anyhow::Result<Self> {
        let mut base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        // Relative joins replace the last path segment unless it ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid request path '{}'", path))
    }

    fn require_token(&self) -> anyhow::Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow!("this command needs a token; pass --token or set JOURNAL_TOKEN"))
    }

    /// Send a request and return the JSON body (`Null` for 204).
    /// Error envelopes become `Err` with the server's message.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>, auth: bool) -> anyhow::Result<Value> {
        let mut request = self.http.request(method.clone(), self.url(path)?);
        if auth {
            request = request.bearer_auth(self.require_token()?);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, path))?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text = response.text().await?;
        let value: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        if !status.is_success() {
            let message = value["error"].as_str().unwrap_or("request failed");
            match value["code"].as_str() {
                Some(code) => bail!("{} ({}, HTTP {})", message, code, status.as_u16()),
                None => bail!("{} (HTTP {})", message, status.as_u16()),
            }
        }
        Ok(value)
    }

    pub async fn get(&self, path: &str, auth: bool) -> anyhow::Result<Value> {
        self.send(Method::GET, path, None, auth).await
    }

    pub async fn post(&self, path: &str, body: &Value, auth: bool) -> anyhow::Result<Value> {
        self.send(Method::POST, path, Some(body), auth).await
    }
}

/// `data` of a success envelope, or the value itself for passthrough payloads
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("success") == Some(&Value::Bool(true)) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl SessionRefresher for ApiClient {
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ProviderError> {
        let url = self.url("refresh").map_err(|e| ProviderError::Config(e.to_string()))?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        SessionTokens::from_payload(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_success_envelope_only() {
        assert_eq!(unwrap_data(json!({"success": true, "data": [1, 2]})), json!([1, 2]));
        let passthrough = json!({"access_token": "a"});
        assert_eq!(unwrap_data(passthrough.clone()), passthrough);
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let client = ApiClient::new("http://localhost:3000", Some(String::new())).unwrap();
        assert!(client.require_token().is_err());
        assert!(ApiClient::new("not a url", None).is_err());
    }

    #[test]
    fn server_path_prefix_is_kept() {
        let client = ApiClient::new("http://host/api", None).unwrap();
        assert_eq!(client.url("entries").unwrap().as_str(), "http://host/api/entries");
        assert_eq!(client.url("keys/bundle/abc/count").unwrap().as_str(), "http://host/api/keys/bundle/abc/count");

        let client = ApiClient::new("http://host/api/", None).unwrap();
        assert_eq!(client.url("whoami").unwrap().as_str(), "http://host/api/whoami");

        let client = ApiClient::new("http://localhost:3000", None).unwrap();
        assert_eq!(client.url("refresh").unwrap().as_str(), "http://localhost:3000/refresh");
    }
}
