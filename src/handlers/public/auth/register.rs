// handlers/public/auth/register.rs - POST /register handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::database::models::ProfileUpdate;
use crate::error::ApiError;
use crate::provider::{signup_user_id, Credentials};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Creates a profile for the new user when present
    #[serde(default)]
    pub username: Option<String>,
}

/// POST /register - Sign-up through the identity provider
///
/// Expected Input:
/// ```json
/// { "email": "user@example.com", "password": "...", "username": "luna" }
/// ```
///
/// Returns the provider's sign-up payload unchanged. A refusal from the provider
/// is reported as 400. Failing to write the profile is logged and does not fail
/// the sign-up.
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    request.credentials.validate()?;

    let profile = request.username.map(ProfileUpdate::new);
    if let Some(profile) = &profile {
        profile.validate()?;
    }

    let signup = state
        .provider
        .sign_up(&request.credentials)
        .await
        .map_err(|e| ApiError::from_provider(e, ApiError::bad_request("Registration failed")))?;

    if let (Some(profile), Some(user_id)) = (profile, signup_user_id(&signup)) {
        match state.store.upsert_profile(user_id, &profile).await {
            Ok(stored) => info!("Created profile {} for new user", stored.id),
            Err(e) => error!("Sign-up succeeded but profile write failed: {}", e),
        }
    }

    info!("Registration succeeded");
    Ok(Json(signup))
}
