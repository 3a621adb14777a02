// handlers/public/profiles.rs - GET /profiles handler

use axum::extract::State;

use crate::database::models::ProfileSummary;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /profiles - Public list of `{id, username}` ordered by id
pub async fn profiles_get(State(state): State<AppState>) -> ApiResult<Vec<ProfileSummary>> {
    let profiles = state.store.list_profiles().await?;
    Ok(ApiResponse::success(profiles.into_iter().map(ProfileSummary::from).collect()))
}
