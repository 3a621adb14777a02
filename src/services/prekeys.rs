use thiserror::Error;
use tracing::{info, warn};

use crate::config::PreKeyConfig;
use crate::database::models::{ClaimedBundle, PreKeyBundle, UserIdentity, ValidationError};
use crate::database::{Store, StoreError};

#[derive(Debug, Error)]
pub enum PreKeyError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("No unique identity after {0} attempts")]
    IdentityExhausted(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validate and store a bundle under a freshly generated identity.
/// Returns the bundle with `user_id` filled in.
pub async fn register_bundle(
    store: &dyn Store,
    config: &PreKeyConfig,
    bundle: PreKeyBundle,
) -> Result<PreKeyBundle, PreKeyError> {
    let hex_len = config.identity_hex_len;
    register_bundle_with(store, config, bundle, || UserIdentity::generate(hex_len)).await
}

/// Same as `register_bundle` with a caller-supplied identity source
pub async fn register_bundle_with<G>(
    store: &dyn Store,
    config: &PreKeyConfig,
    bundle: PreKeyBundle,
    mut generate: G,
) -> Result<PreKeyBundle, PreKeyError>
where
    G: FnMut() -> UserIdentity + Send,
{
    bundle.validate(config.max_one_time_prekeys)?;

    for attempt in 1..=config.max_identity_attempts {
        let identity = generate();
        match store.insert_bundle(&identity, &bundle).await {
            Ok(()) => {
                info!(
                    "Registered pre-key bundle {} with {} one-time keys",
                    identity,
                    bundle.one_time_pre_keys.len()
                );
                return Ok(bundle.with_identity(identity));
            }
            Err(StoreError::Conflict(_)) => {
                warn!("Identity collision on attempt {}, regenerating", attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(PreKeyError::IdentityExhausted(config.max_identity_attempts))
}

pub async fn claim_bundle(store: &dyn Store, identity: &UserIdentity) -> Result<ClaimedBundle, PreKeyError> {
    let claimed = store
        .claim_bundle(identity)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("No pre-key bundle for {}", identity)))?;

    if claimed.one_time_pre_key.is_none() {
        warn!("Bundle {} has no one-time pre-keys left", identity);
    }
    Ok(claimed)
}

pub async fn count_one_time_prekeys(store: &dyn Store, identity: &UserIdentity) -> Result<i64, PreKeyError> {
    let count = store
        .count_one_time_prekeys(identity)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("No pre-key bundle for {}", identity)))?;
    Ok(count)
}
