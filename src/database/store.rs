use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::database::models::{
    ClaimedBundle, Entry, EntryBody, EntryCategory, EntryPatch, PreKeyBundle, Profile, ProfileUpdate, UserIdentity,
};

/// Errors from any `Store` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint hit; callers that generate keys retry on this
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bundle registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Row decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn entry_not_found(category: EntryCategory, id: i64) -> Self {
        StoreError::NotFound(format!("No {} entry with id {}", category, id))
    }

    /// A failed bundle write. Lost connectivity stays `Unavailable` so it surfaces as 503.
    pub fn registration_failed(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::RegistrationFailed(other.to_string()),
        }
    }
}

/// Persistence seam shared by the Postgres pool and the in-memory store.
///
/// Every entry operation is scoped to `owner`; rows belonging to other users
/// behave as if they did not exist.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Entries newest first. `None` merges all categories.
    async fn list_entries(&self, owner: &str, category: Option<EntryCategory>) -> Result<Vec<Entry>, StoreError>;

    async fn insert_entry(&self, owner: &str, body: EntryBody, created_at: DateTime<Utc>) -> Result<Entry, StoreError>;

    async fn update_entry(
        &self,
        owner: &str,
        category: EntryCategory,
        id: i64,
        patch: EntryPatch,
    ) -> Result<Entry, StoreError>;

    async fn delete_entry(&self, owner: &str, category: EntryCategory, id: i64) -> Result<(), StoreError>;

    /// Null out `let_go` on moon entries created before `older_than`
    async fn clear_expired_let_go(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;

    /// All profiles ordered by id
    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError>;

    /// Persist a bundle and its one-time keys as one unit.
    /// `Conflict` when the identity is taken, `RegistrationFailed` for anything else.
    async fn insert_bundle(&self, identity: &UserIdentity, bundle: &PreKeyBundle) -> Result<(), StoreError>;

    /// Fetch a bundle and consume its lowest-id one-time key. `None` for unknown identities.
    async fn claim_bundle(&self, identity: &UserIdentity) -> Result<Option<ClaimedBundle>, StoreError>;

    /// Remaining one-time keys. `None` for unknown identities.
    async fn count_one_time_prekeys(&self, identity: &UserIdentity) -> Result<Option<i64>, StoreError>;
}
