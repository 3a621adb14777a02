use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use uuid::Uuid;

use super::ValidationError;

/// Opaque lowercase-hex identifier handed out at bundle registration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    /// SHA-512 of a fresh v4 UUID, truncated to `hex_len` hex characters
    pub fn generate(hex_len: usize) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(Uuid::new_v4().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let len = hex_len.clamp(1, digest.len());
        Self(digest[..len].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPreKey {
    pub key_id: i32,
    pub public_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePreKey {
    pub key_id: i32,
    pub public_key: String,
}

fn default_device_id() -> i32 {
    1
}

/// Registration payload, echoed back with `userId` once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreKeyBundle {
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserIdentity>,
    pub registration_id: i32,
    #[serde(rename = "identityKeyPublic")]
    pub identity_key: String,
    pub signed_pre_key: SignedPreKey,
    #[serde(default = "default_device_id")]
    pub device_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<i32>,
    #[serde(default, alias = "preKeys")]
    pub one_time_pre_keys: Vec<OneTimePreKey>,
}

impl PreKeyBundle {
    pub fn validate(&self, max_one_time_prekeys: usize) -> Result<(), ValidationError> {
        if self.registration_id < 0 {
            return Err(ValidationError::invalid("registrationId", "must not be negative"));
        }
        if self.identity_key.trim().is_empty() {
            return Err(ValidationError::MissingField("identityKeyPublic".to_string()));
        }
        if self.signed_pre_key.public_key.trim().is_empty() {
            return Err(ValidationError::MissingField("signedPreKey.publicKey".to_string()));
        }
        if self.signed_pre_key.signature.trim().is_empty() {
            return Err(ValidationError::MissingField("signedPreKey.signature".to_string()));
        }
        if self.one_time_pre_keys.len() > max_one_time_prekeys {
            return Err(ValidationError::invalid(
                "oneTimePreKeys",
                format!("at most {} keys per bundle", max_one_time_prekeys),
            ));
        }

        let mut seen = HashSet::new();
        for key in &self.one_time_pre_keys {
            if key.public_key.trim().is_empty() {
                return Err(ValidationError::invalid(
                    "oneTimePreKeys",
                    format!("key {} has an empty public key", key.key_id),
                ));
            }
            if !seen.insert(key.key_id) {
                return Err(ValidationError::invalid(
                    "oneTimePreKeys",
                    format!("duplicate key id {}", key.key_id),
                ));
            }
        }
        Ok(())
    }

    pub fn with_identity(mut self, identity: UserIdentity) -> Self {
        self.user_id = Some(identity);
        self
    }
}

/// What a peer receives when starting a session with `user_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedBundle {
    pub user_id: UserIdentity,
    pub registration_id: i32,
    #[serde(rename = "identityKeyPublic")]
    pub identity_key: String,
    pub signed_pre_key: SignedPreKey,
    pub device_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<i32>,
    /// `None` once the bundle's one-time keys are used up
    pub one_time_pre_key: Option<OneTimePreKey>,
}

impl ClaimedBundle {
    pub fn from_bundle(user_id: UserIdentity, bundle: &PreKeyBundle, one_time_pre_key: Option<OneTimePreKey>) -> Self {
        Self {
            user_id,
            registration_id: bundle.registration_id,
            identity_key: bundle.identity_key.clone(),
            signed_pre_key: bundle.signed_pre_key.clone(),
            device_id: bundle.device_id,
            username: bundle.username.clone(),
            picture: bundle.picture,
            one_time_pre_key,
        }
    }
}
