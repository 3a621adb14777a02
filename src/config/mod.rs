use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Ten years; larger values overflow `chrono::Duration::hours`
pub const MAX_LET_GO_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub security: SecurityConfig,
    pub prekeys: PreKeyConfig,
    pub moon: MoonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. `None` selects the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the identity provider (without the `/auth/v1` suffix)
    pub url: String,
    pub api_key: String,
    /// HS256 secret used to verify access tokens locally.
    /// When unset, tokens are verified by asking the provider.
    pub jwt_secret: Option<String>,
    pub jwt_audience: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreKeyConfig {
    pub identity_hex_len: usize,
    pub max_identity_attempts: u32,
    pub max_one_time_prekeys: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoonConfig {
    pub let_go_ttl_hours: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("JOURNAL_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Provider overrides
        if let Ok(v) = env::var("PROVIDER_URL") {
            self.provider.url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("PROVIDER_API_KEY") {
            self.provider.api_key = v;
        }
        if let Ok(v) = env::var("PROVIDER_JWT_SECRET") {
            self.provider.jwt_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("PROVIDER_JWT_AUDIENCE") {
            self.provider.jwt_audience = v;
        }
        if let Ok(v) = env::var("PROVIDER_TIMEOUT_SECS") {
            self.provider.timeout_secs = v.parse().unwrap_or(self.provider.timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        // Pre-key overrides
        if let Ok(v) = env::var("PREKEY_IDENTITY_HEX_LEN") {
            self.prekeys.identity_hex_len = v.parse().unwrap_or(self.prekeys.identity_hex_len);
        }
        if let Ok(v) = env::var("PREKEY_MAX_IDENTITY_ATTEMPTS") {
            self.prekeys.max_identity_attempts = v.parse().unwrap_or(self.prekeys.max_identity_attempts);
        }
        if let Ok(v) = env::var("PREKEY_MAX_ONE_TIME_PREKEYS") {
            self.prekeys.max_one_time_prekeys = v.parse().unwrap_or(self.prekeys.max_one_time_prekeys);
        }

        // Moon entry overrides
        if let Ok(v) = env::var("MOON_LET_GO_TTL_HOURS") {
            self.moon.let_go_ttl_hours = v.parse().unwrap_or(self.moon.let_go_ttl_hours);
        }
        if let Ok(v) = env::var("MOON_SWEEP_INTERVAL_SECS") {
            self.moon.sweep_interval_secs = v.parse().unwrap_or(self.moon.sweep_interval_secs);
        }

        self
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.url.is_empty() {
            return Err(ConfigError::Missing("PROVIDER_URL"));
        }
        url::Url::parse(&self.provider.url)
            .map_err(|e| ConfigError::Invalid(format!("PROVIDER_URL: {}", e)))?;

        if !(8..=128).contains(&self.prekeys.identity_hex_len) {
            return Err(ConfigError::Invalid(format!(
                "PREKEY_IDENTITY_HEX_LEN must be between 8 and 128, got {}",
                self.prekeys.identity_hex_len
            )));
        }
        if self.prekeys.max_identity_attempts == 0 {
            return Err(ConfigError::Invalid("PREKEY_MAX_IDENTITY_ATTEMPTS must be at least 1".to_string()));
        }
        if !(1..=MAX_LET_GO_TTL_HOURS).contains(&self.moon.let_go_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "MOON_LET_GO_TTL_HOURS must be between 1 and {}, got {}",
                MAX_LET_GO_TTL_HOURS, self.moon.let_go_ttl_hours
            )));
        }
        if self.moon.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("MOON_SWEEP_INTERVAL_SECS must be at least 1".to_string()));
        }

        if self.environment == Environment::Production {
            if self.database.url.is_none() {
                return Err(ConfigError::Missing("DATABASE_URL"));
            }
            if self.provider.api_key.is_empty() {
                return Err(ConfigError::Missing("PROVIDER_API_KEY"));
            }
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            provider: ProviderConfig {
                url: "http://127.0.0.1:54321".to_string(),
                api_key: String::new(),
                jwt_secret: None,
                jwt_audience: "authenticated".to_string(),
                timeout_secs: 10,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            prekeys: PreKeyConfig {
                identity_hex_len: 16,
                max_identity_attempts: 5,
                max_one_time_prekeys: 100,
            },
            moon: MoonConfig {
                let_go_ttl_hours: 24,
                sweep_interval_secs: 3600,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            provider: ProviderConfig {
                url: String::new(),
                timeout_secs: 5,
                ..Self::development().provider
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.database.url.is_none());
        assert_eq!(config.prekeys.identity_hex_len, 16);
        assert_eq!(config.moon.let_go_ttl_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_database_and_provider() {
        let mut config = AppConfig::production();
        assert_eq!(config.validate(), Err(ConfigError::Missing("PROVIDER_URL")));

        config.provider.url = "https://auth.example.com".to_string();
        assert_eq!(config.validate(), Err(ConfigError::Missing("DATABASE_URL")));

        config.database.url = Some("postgres://localhost/journal".to_string());
        assert_eq!(config.validate(), Err(ConfigError::Missing("PROVIDER_API_KEY")));

        config.provider.api_key = "anon".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_identity_length_bounds() {
        let mut config = AppConfig::development();
        config.prekeys.identity_hex_len = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.prekeys.identity_hex_len = 129;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_let_go_ttl_bounds() {
        let mut config = AppConfig::development();
        for hours in [0, -5, MAX_LET_GO_TTL_HOURS + 1, i64::MAX] {
            config.moon.let_go_ttl_hours = hours;
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "accepted {}", hours);
        }
        config.moon.let_go_ttl_hours = MAX_LET_GO_TTL_HOURS;
        assert!(config.validate().is_ok());
    }
}
