// handlers/protected/keys.rs - Pre-key bundle endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::database::models::{ClaimedBundle, PreKeyBundle, UserIdentity};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::prekeys;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreKeyCount {
    pub user_id: UserIdentity,
    pub count: i64,
}

/// POST /keys/bundle - Register a bundle under a newly generated identity
///
/// Expected Input:
/// ```json
/// {
///   "registrationId": 42,
///   "identityKeyPublic": "...",
///   "signedPreKey": { "keyId": 1, "publicKey": "...", "signature": "..." },
///   "oneTimePreKeys": [{ "keyId": 1, "publicKey": "..." }]
/// }
/// ```
///
/// Responds 201 with the bundle echoed back and `userId` filled in.
pub async fn bundle_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<PreKeyBundle>, JsonRejection>,
) -> ApiResult<PreKeyBundle> {
    let Json(bundle) = payload?;
    let stored = prekeys::register_bundle(state.store.as_ref(), &state.config.prekeys, bundle).await?;
    tracing::debug!("Bundle registered by {}", user.user_id);
    Ok(ApiResponse::created(stored))
}

/// GET /keys/bundle/:user_id - Claim a bundle to start a session with its owner.
/// Consumes one one-time pre-key; `oneTimePreKey` is null once they run out.
pub async fn bundle_get(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ClaimedBundle> {
    let claimed = prekeys::claim_bundle(state.store.as_ref(), &UserIdentity::from(user_id)).await?;
    Ok(ApiResponse::success(claimed))
}

/// GET /keys/bundle/:user_id/count
pub async fn bundle_count_get(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<PreKeyCount> {
    let identity = UserIdentity::from(user_id);
    let count = prekeys::count_one_time_prekeys(state.store.as_ref(), &identity).await?;
    Ok(ApiResponse::success(PreKeyCount {
        user_id: identity,
        count,
    }))
}
