use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::database::models::{Entry, NewEntry};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /entries - Create an entry owned by the caller
///
/// Expected Input:
/// ```json
/// { "table": "journal_entries", "content": "...", "emotion_color": "#ffcc00" }
/// ```
///
/// `id`, `user_id` and `created_at` are assigned here and rejected if sent.
pub async fn entries_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Entry> {
    let Json(body) = payload?;
    let NewEntry(entry) = NewEntry::from_json(body)?;

    let stored = state.store.insert_entry(&user.user_id, entry, Utc::now()).await?;
    tracing::info!("Created {} entry {}", stored.table, stored.id);
    Ok(ApiResponse::created(stored))
}
