use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::database::models::{Entry, EntryCategory};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EntriesQuery {
    pub selected_index: Option<i64>,
}

/// GET /entries - The caller's entries, newest first
///
/// `selected_index` picks one category (0 journal, 1 moon, 2 relationship
/// check); without it all categories are merged.
pub async fn entries_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<EntriesQuery>, QueryRejection>,
) -> ApiResult<Vec<Entry>> {
    let Query(query) = query?;
    let category = query.selected_index.map(EntryCategory::from_index).transpose()?;

    let entries = state.store.list_entries(&user.user_id, category).await?;
    tracing::debug!("Listed {} entries", entries.len());
    Ok(ApiResponse::success(entries))
}
