use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::database::models::{Entry, EntryUpdate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// PUT /entries - Partial update of one of the caller's entries
///
/// Absent fields are kept, `null` clears a nullable field and any other value
/// replaces it.
///
/// Expected Input:
/// ```json
/// { "table": "moon_entries", "id": 12, "want": ["rest"], "let_go": null }
/// ```
pub async fn entries_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Entry> {
    let Json(body) = payload?;
    let update = EntryUpdate::from_json(body)?;

    let category = update.category();
    let updated = state
        .store
        .update_entry(&user.user_id, category, update.id, update.patch)
        .await?;
    tracing::info!("Updated {} entry {}", category, updated.id);
    Ok(ApiResponse::success(updated))
}
