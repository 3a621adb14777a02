use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::auth::AuthUser;
use crate::database::models::EntryRef;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// DELETE /delete - Remove one of the caller's entries
///
/// Expected Input:
/// ```json
/// { "table": "relationship_check", "id": 4 }
/// ```
///
/// Deleting an id that does not exist (or was already deleted) is a 404.
pub async fn entry_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<EntryRef>, JsonRejection>,
) -> ApiResult<()> {
    let Json(target) = payload?;
    let category = target.category()?;

    state.store.delete_entry(&user.user_id, category, target.id).await?;
    tracing::info!("Deleted {} entry {}", category, target.id);
    Ok(ApiResponse::no_content())
}
