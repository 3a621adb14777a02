// handlers/public/auth/refresh.rs - POST /refresh handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::ValidationError;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /refresh - Trade a refresh token for a new session
///
/// Expected Input:
/// ```json
/// { "refresh_token": "..." }
/// ```
pub async fn refresh_post(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    if request.refresh_token.trim().is_empty() {
        return Err(ValidationError::MissingField("refresh_token".to_string()).into());
    }

    let session = state
        .provider
        .refresh_session(&request.refresh_token)
        .await
        .map_err(|e| ApiError::from_provider(e, ApiError::unauthorized("Token refresh failed")))?;

    Ok(Json(session))
}
