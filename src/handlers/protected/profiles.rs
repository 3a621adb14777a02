// handlers/protected/profiles.rs - PUT /profiles/me handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};

use crate::auth::AuthUser;
use crate::database::models::{Profile, ProfileUpdate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// PUT /profiles/me - Create or replace the caller's profile
///
/// Expected Input:
/// ```json
/// { "username": "luna", "avatar_url": 3 }
/// ```
pub async fn profile_me_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Profile> {
    let Json(update) = payload?;
    update.validate()?;

    let profile = state.store.upsert_profile(&user.user_id, &update).await?;
    Ok(ApiResponse::success(profile))
}
