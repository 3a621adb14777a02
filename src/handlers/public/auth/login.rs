// handlers/public/auth/login.rs - POST /login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::provider::Credentials;
use crate::state::AppState;

/// POST /login - Password sign-in through the identity provider
///
/// Expected Input:
/// ```json
/// { "email": "user@example.com", "password": "..." }
/// ```
///
/// On success the provider's session payload (`access_token`, `refresh_token`,
/// `expires_in`, `user`, ...) is returned as-is. A refusal from the provider is
/// reported as 401.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(credentials) = payload?;
    credentials.validate()?;

    let session = state
        .provider
        .sign_in_with_password(&credentials)
        .await
        .map_err(|e| ApiError::from_provider(e, ApiError::unauthorized("Login failed")))?;

    info!("Login succeeded");
    Ok(Json(session))
}
