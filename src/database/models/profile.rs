use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub avatar_url: Option<i32>,
}

/// Public view of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: i64,
    pub username: String,
}

impl From<Profile> for ProfileSummary {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
        }
    }
}

/// Body of `PUT /profiles/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<i32>,
}

impl ProfileUpdate {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            avatar_url: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username).map_err(|message| ValidationError::invalid("username", message))
    }
}

/// 3 to 50 characters of letters, digits, `_` or `-`, starting alphanumeric
pub fn validate_username(username: &str) -> Result<(), String> {
    let length = username.chars().count();
    if length < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }
    if length > 50 {
        return Err("Username must be at most 50 characters".to_string());
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err("Username can only contain letters, numbers, underscore, and hyphen".to_string());
    }

    if !username.chars().next().is_some_and(char::is_alphanumeric) {
        return Err("Username must start with a letter or number".to_string());
    }

    Ok(())
}
