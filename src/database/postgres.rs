use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde_json::Value;
use sqlx::{postgres::PgArguments, FromRow, PgPool, Postgres, Row};
use tracing::debug;

use crate::database::manager::DatabaseManager;
use crate::database::models::{
    ClaimedBundle, ColumnValue, Entry, EntryBody, EntryCategory, EntryPatch, OneTimePreKey, PreKeyBundle, Profile,
    ProfileUpdate, SignedPreKey, UserIdentity,
};
use crate::database::store::{Store, StoreError};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

const UNIQUE_VIOLATION: &str = "23505";

/// `Store` backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn select_entries(&self, owner: &str, category: EntryCategory) -> Result<Vec<Entry>, StoreError> {
        // row_to_json avoids hand-mapping each category's columns
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE user_id = $1 ORDER BY created_at DESC, id DESC) t",
            category.table()
        );
        let rows: Vec<Value> = sqlx::query_scalar(&sql).bind(owner).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| Entry::from_row(category, row).map_err(StoreError::from))
            .collect()
    }
}

fn bind_column<'q>(q: PgQuery<'q>, value: ColumnValue) -> PgQuery<'q> {
    match value {
        ColumnValue::Text(v) => q.bind(v),
        ColumnValue::Json(v) => q.bind(v),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[derive(Debug, FromRow)]
struct BundleRow {
    registrationid: i32,
    identitykey: String,
    signedprekey: String,
    signedprekey_id: i32,
    sig_signedprekey: String,
    deviceid: i32,
    username: Option<String>,
    picture: Option<i32>,
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn list_entries(&self, owner: &str, category: Option<EntryCategory>) -> Result<Vec<Entry>, StoreError> {
        match category {
            Some(category) => self.select_entries(owner, category).await,
            None => {
                let per_table = try_join_all(EntryCategory::ALL.map(|c| self.select_entries(owner, c))).await?;
                let mut entries: Vec<Entry> = per_table.into_iter().flatten().collect();
                entries.sort_by(Entry::newest_first);
                Ok(entries)
            }
        }
    }

    async fn insert_entry(&self, owner: &str, body: EntryBody, created_at: DateTime<Utc>) -> Result<Entry, StoreError> {
        let category = body.category();
        let columns = body.columns();

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let placeholders: Vec<String> = (0..columns.len()).map(|i| format!("${}", i + 3)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" AS r (user_id, created_at, {}) VALUES ($1, $2, {}) RETURNING row_to_json(r) AS row",
            category.table(),
            names.join(", "),
            placeholders.join(", ")
        );

        let mut q = sqlx::query(&sql).bind(owner).bind(created_at);
        for (_, value) in columns {
            q = bind_column(q, value);
        }
        let row: Value = q.fetch_one(&self.pool).await?.try_get("row")?;
        Ok(Entry::from_row(category, row)?)
    }

    async fn update_entry(
        &self,
        owner: &str,
        category: EntryCategory,
        id: i64,
        patch: EntryPatch,
    ) -> Result<Entry, StoreError> {
        let assignments = patch.assignments();
        if assignments.is_empty() {
            return Err(StoreError::QueryError("update without columns".to_string()));
        }

        let sets: Vec<String> = assignments
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ${}", name, i + 3))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" AS r SET {} WHERE id = $1 AND user_id = $2 RETURNING row_to_json(r) AS row",
            category.table(),
            sets.join(", ")
        );

        let mut q = sqlx::query(&sql).bind(id).bind(owner);
        for (_, value) in assignments {
            q = bind_column(q, value);
        }

        match q.fetch_optional(&self.pool).await? {
            Some(row) => {
                let row: Value = row.try_get("row")?;
                Ok(Entry::from_row(category, row)?)
            }
            None => Err(StoreError::entry_not_found(category, id)),
        }
    }

    async fn delete_entry(&self, owner: &str, category: EntryCategory, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1 AND user_id = $2", category.table());
        let result = sqlx::query(&sql).bind(id).bind(owner).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::entry_not_found(category, id));
        }
        Ok(())
    }

    async fn clear_expired_let_go(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE moon_entries SET let_go = NULL WHERE created_at < $1 AND let_go IS NOT NULL")
            .bind(older_than)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let profiles = sqlx::query_as::<_, Profile>("SELECT id, user_id, username, avatar_url FROM profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError> {
        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (user_id, username, avatar_url) VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE SET username = EXCLUDED.username, avatar_url = EXCLUDED.avatar_url
             RETURNING id, user_id, username, avatar_url",
        )
        .bind(user_id)
        .bind(&update.username)
        .bind(update.avatar_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn insert_bundle(&self, identity: &UserIdentity, bundle: &PreKeyBundle) -> Result<(), StoreError> {
        let failed = StoreError::registration_failed;

        // Dropping the transaction on any early return rolls it back
        let mut tx = self.pool.begin().await.map_err(failed)?;

        sqlx::query(
            "INSERT INTO prekeybundle
             (userid, registrationid, identitykey, signedprekey, signedprekey_id, sig_signedprekey, deviceid, username, picture)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(identity.as_str())
        .bind(bundle.registration_id)
        .bind(&bundle.identity_key)
        .bind(&bundle.signed_pre_key.public_key)
        .bind(bundle.signed_pre_key.key_id)
        .bind(&bundle.signed_pre_key.signature)
        .bind(bundle.device_id)
        .bind(&bundle.username)
        .bind(bundle.picture)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("identity {} already registered", identity))
            } else {
                failed(e)
            }
        })?;

        if !bundle.one_time_pre_keys.is_empty() {
            let keys: Vec<String> = bundle.one_time_pre_keys.iter().map(|k| k.public_key.clone()).collect();
            let ids: Vec<i32> = bundle.one_time_pre_keys.iter().map(|k| k.key_id).collect();
            sqlx::query(
                "INSERT INTO onetimeprekeys (opk, opk_id, userid)
                 SELECT k.opk, k.opk_id, $3 FROM UNNEST($1::varchar[], $2::integer[]) AS k(opk, opk_id)",
            )
            .bind(&keys)
            .bind(&ids)
            .bind(identity.as_str())
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        }

        tx.commit().await.map_err(failed)?;
        debug!(
            "Stored bundle {} with {} one-time keys",
            identity,
            bundle.one_time_pre_keys.len()
        );
        Ok(())
    }

    async fn claim_bundle(&self, identity: &UserIdentity) -> Result<Option<ClaimedBundle>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BundleRow>(
            "SELECT registrationid, identitykey, signedprekey, signedprekey_id, sig_signedprekey, deviceid, username, picture
             FROM prekeybundle WHERE userid = $1",
        )
        .bind(identity.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // SKIP LOCKED hands concurrent claimers different keys
        let key: Option<(i32, String)> = sqlx::query_as(
            "DELETE FROM onetimeprekeys
             WHERE userid = $1 AND opk_id = (
                 SELECT opk_id FROM onetimeprekeys WHERE userid = $1
                 ORDER BY opk_id LIMIT 1 FOR UPDATE SKIP LOCKED
             )
             RETURNING opk_id, opk",
        )
        .bind(identity.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ClaimedBundle {
            user_id: identity.clone(),
            registration_id: row.registrationid,
            identity_key: row.identitykey,
            signed_pre_key: SignedPreKey {
                key_id: row.signedprekey_id,
                public_key: row.signedprekey,
                signature: row.sig_signedprekey,
            },
            device_id: row.deviceid,
            username: row.username,
            picture: row.picture,
            one_time_pre_key: key.map(|(key_id, public_key)| OneTimePreKey { key_id, public_key }),
        }))
    }

    async fn count_one_time_prekeys(&self, identity: &UserIdentity) -> Result<Option<i64>, StoreError> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM onetimeprekeys o WHERE o.userid = b.userid)
             FROM prekeybundle b WHERE b.userid = $1",
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }
}
