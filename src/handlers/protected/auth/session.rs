use axum::{extract::State, Extension};

use crate::auth::{AuthUser, BearerToken};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /whoami - Verified identity of the caller
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": { "user_id": "uuid", "email": "user@example.com", "role": "authenticated" }
/// }
/// ```
pub async fn whoami_get(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(user))
}

/// POST /logout - Revoke the caller's session at the provider
///
/// The server keeps no session of its own, so there is nothing to clear locally.
pub async fn logout_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> ApiResult<()> {
    state
        .provider
        .sign_out(&token)
        .await
        .map_err(|e| ApiError::from_provider(e, ApiError::unauthorized("Logout failed")))?;

    tracing::info!("Signed out {}", user.user_id);
    Ok(ApiResponse::no_content())
}
