use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database::models::{
    ClaimedBundle, Entry, EntryBody, EntryCategory, EntryPatch, OneTimePreKey, PreKeyBundle, Profile, ProfileUpdate,
    UserIdentity,
};
use crate::database::store::{Store, StoreError};

struct StoredBundle {
    bundle: PreKeyBundle,
    /// Keyed by key id so claims take the lowest first
    one_time: BTreeMap<i32, OneTimePreKey>,
}

#[derive(Default)]
struct Inner {
    last_entry_id: i64,
    last_profile_id: i64,
    entries: BTreeMap<(EntryCategory, i64), Entry>,
    profiles: Vec<Profile>,
    bundles: HashMap<UserIdentity, StoredBundle>,
}

/// `Store` kept in process memory, for development and tests.
/// A single lock serializes writers, which makes every operation atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_entries(&self, owner: &str, category: Option<EntryCategory>) -> Result<Vec<Entry>, StoreError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<Entry> = inner
            .entries
            .values()
            .filter(|e| e.user_id == owner)
            .filter(|e| category.map_or(true, |c| e.table == c))
            .cloned()
            .collect();
        entries.sort_by(Entry::newest_first);
        Ok(entries)
    }

    async fn insert_entry(&self, owner: &str, body: EntryBody, created_at: DateTime<Utc>) -> Result<Entry, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_entry_id += 1;
        let entry = Entry {
            id: inner.last_entry_id,
            table: body.category(),
            user_id: owner.to_string(),
            created_at,
            body,
        };
        inner.entries.insert((entry.table, entry.id), entry.clone());
        Ok(entry)
    }

    async fn update_entry(
        &self,
        owner: &str,
        category: EntryCategory,
        id: i64,
        patch: EntryPatch,
    ) -> Result<Entry, StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(&(category, id))
            .filter(|e| e.user_id == owner)
            .ok_or_else(|| StoreError::entry_not_found(category, id))?;

        if !patch.apply(&mut entry.body) {
            return Err(StoreError::QueryError(format!("patch does not apply to {}", category)));
        }
        Ok(entry.clone())
    }

    async fn delete_entry(&self, owner: &str, category: EntryCategory, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.entries.get(&(category, id)) {
            Some(e) if e.user_id == owner => {
                inner.entries.remove(&(category, id));
                Ok(())
            }
            _ => Err(StoreError::entry_not_found(category, id)),
        }
    }

    async fn clear_expired_let_go(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut cleared = 0;
        for entry in inner.entries.values_mut() {
            if entry.created_at >= older_than {
                continue;
            }
            if let EntryBody::Moon(moon) = &mut entry.body {
                if moon.let_go.take().is_some() {
                    cleared += 1;
                }
            }
        }
        Ok(cleared)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.inner.read().await.profiles.clone())
    }

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.profiles.iter_mut().find(|p| p.user_id == user_id) {
            existing.username = update.username.clone();
            existing.avatar_url = update.avatar_url;
            return Ok(existing.clone());
        }

        inner.last_profile_id += 1;
        let profile = Profile {
            id: inner.last_profile_id,
            user_id: user_id.to_string(),
            username: update.username.clone(),
            avatar_url: update.avatar_url,
        };
        inner.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn insert_bundle(&self, identity: &UserIdentity, bundle: &PreKeyBundle) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.bundles.contains_key(identity) {
            return Err(StoreError::Conflict(format!("identity {} already registered", identity)));
        }

        // Check everything before touching the map so a failure leaves no trace
        let mut one_time = BTreeMap::new();
        for key in &bundle.one_time_pre_keys {
            if one_time.insert(key.key_id, key.clone()).is_some() {
                return Err(StoreError::RegistrationFailed(format!(
                    "duplicate one-time key id {}",
                    key.key_id
                )));
            }
        }

        let mut stored = bundle.clone();
        stored.one_time_pre_keys.clear();
        inner.bundles.insert(
            identity.clone(),
            StoredBundle {
                bundle: stored,
                one_time,
            },
        );
        Ok(())
    }

    async fn claim_bundle(&self, identity: &UserIdentity) -> Result<Option<ClaimedBundle>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.bundles.get_mut(identity) else {
            return Ok(None);
        };
        let key = stored.one_time.pop_first().map(|(_, key)| key);
        Ok(Some(ClaimedBundle::from_bundle(identity.clone(), &stored.bundle, key)))
    }

    async fn count_one_time_prekeys(&self, identity: &UserIdentity) -> Result<Option<i64>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.bundles.get(identity).map(|b| b.one_time.len() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::entry::{JournalFields, MoonFields};
    use crate::database::models::SignedPreKey;
    use chrono::Duration;
    use serde_json::json;

    fn journal(content: &str) -> EntryBody {
        EntryBody::Journal(JournalFields {
            content: content.to_string(),
            content_grateful: None,
            content_proud: None,
            emotion_color: None,
        })
    }

    fn bundle(key_ids: &[i32]) -> PreKeyBundle {
        PreKeyBundle {
            user_id: None,
            registration_id: 7,
            identity_key: "ik".to_string(),
            signed_pre_key: SignedPreKey {
                key_id: 1,
                public_key: "spk".to_string(),
                signature: "sig".to_string(),
            },
            device_id: 1,
            username: None,
            picture: None,
            one_time_pre_keys: key_ids
                .iter()
                .map(|id| OneTimePreKey {
                    key_id: *id,
                    public_key: format!("opk-{}", id),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn entries_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mine = store.insert_entry("alice", journal("a"), now).await.unwrap();
        store.insert_entry("bob", journal("b"), now).await.unwrap();

        let listed = store.list_entries("alice", None).await.unwrap();
        assert_eq!(listed, vec![mine.clone()]);

        let err = store.delete_entry("bob", EntryCategory::Journal, mine.id).await;
        assert!(matches!(err, Err(StoreError::NotFound(_))));
        assert!(store.delete_entry("alice", EntryCategory::Journal, mine.id).await.is_ok());
        assert!(matches!(
            store.delete_entry("alice", EntryCategory::Journal, mine.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_entry("u", journal("old"), now - Duration::hours(2)).await.unwrap();
        store.insert_entry("u", journal("new"), now).await.unwrap();

        let listed = store.list_entries("u", Some(EntryCategory::Journal)).await.unwrap();
        assert_eq!(listed[0].body, journal("new"));
        assert_eq!(listed[1].body, journal("old"));
    }

    #[tokio::test]
    async fn sweeper_clears_only_expired_let_go() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let moon = |sign: &str| {
            EntryBody::Moon(MoonFields {
                let_go: Some(json!(["worry"])),
                want: Some(json!(["sleep"])),
                moon_sign: sign.to_string(),
            })
        };
        store.insert_entry("u", moon("old"), now - Duration::hours(30)).await.unwrap();
        store.insert_entry("u", moon("fresh"), now).await.unwrap();

        let cleared = store.clear_expired_let_go(now - Duration::hours(24)).await.unwrap();
        assert_eq!(cleared, 1);

        let listed = store.list_entries("u", Some(EntryCategory::Moon)).await.unwrap();
        match (&listed[0].body, &listed[1].body) {
            (EntryBody::Moon(fresh), EntryBody::Moon(old)) => {
                assert!(fresh.let_go.is_some());
                assert!(old.let_go.is_none());
                assert!(old.want.is_some());
            }
            other => panic!("unexpected bodies {:?}", other),
        }
    }

    #[tokio::test]
    async fn claims_consume_lowest_key_first() {
        let store = MemoryStore::new();
        let id = UserIdentity::from("abc".to_string());
        store.insert_bundle(&id, &bundle(&[5, 2])).await.unwrap();

        let first = store.claim_bundle(&id).await.unwrap().unwrap();
        assert_eq!(first.one_time_pre_key.map(|k| k.key_id), Some(2));
        assert_eq!(store.count_one_time_prekeys(&id).await.unwrap(), Some(1));

        store.claim_bundle(&id).await.unwrap();
        let exhausted = store.claim_bundle(&id).await.unwrap().unwrap();
        assert!(exhausted.one_time_pre_key.is_none());
        assert_eq!(exhausted.registration_id, 7);
    }

    #[tokio::test]
    async fn duplicate_identity_conflicts_and_bad_bundle_leaves_nothing() {
        let store = MemoryStore::new();
        let id = UserIdentity::from("abc".to_string());
        store.insert_bundle(&id, &bundle(&[1])).await.unwrap();
        assert!(matches!(store.insert_bundle(&id, &bundle(&[1])).await, Err(StoreError::Conflict(_))));

        let other = UserIdentity::from("def".to_string());
        let result = store.insert_bundle(&other, &bundle(&[1, 1])).await;
        assert!(matches!(result, Err(StoreError::RegistrationFailed(_))));
        assert_eq!(store.count_one_time_prekeys(&other).await.unwrap(), None);
        assert!(store.claim_bundle(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_upsert_keeps_id() {
        let store = MemoryStore::new();
        let first = store.upsert_profile("u", &ProfileUpdate::new("luna")).await.unwrap();
        let second = store.upsert_profile("u", &ProfileUpdate::new("sol")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_profiles().await.unwrap().len(), 1);
    }
}
