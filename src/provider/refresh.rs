use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{ProviderError, SessionTokens};

/// Anything that can trade a refresh token for a new session
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ProviderError>;
}

/// Timing of the auto-refresh loop
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Failed attempts that back off exponentially before settling on `steady_retry`
    pub backoff_attempts: u32,
    pub backoff_base: Duration,
    pub steady_retry: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            backoff_attempts: 3,
            backoff_base: Duration::from_secs(1),
            steady_retry: Duration::from_secs(30),
        }
    }
}

impl RefreshPolicy {
    /// Refresh once three quarters of the token lifetime has passed,
    /// never sooner than `backoff_base`
    pub fn refresh_after(&self, expires_in_secs: u64) -> Duration {
        (Duration::from_secs(expires_in_secs) * 3 / 4).max(self.backoff_base)
    }

    /// Delay before retry number `attempt` (1-based): 2s, 4s, 8s, then 30s
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 || attempt > self.backoff_attempts {
            return self.steady_retry;
        }
        self.backoff_base * 2u32.pow(attempt)
    }
}

/// Keep a session alive until `shutdown` flips. Returns the latest tokens.
pub async fn run_auto_refresh<F>(
    refresher: &dyn SessionRefresher,
    mut tokens: SessionTokens,
    policy: &RefreshPolicy,
    mut on_refresh: F,
    mut shutdown: watch::Receiver<bool>,
) -> SessionTokens
where
    F: FnMut(&SessionTokens) + Send,
{
    let mut attempt = 0u32;
    let mut wait = policy.refresh_after(tokens.expires_in);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => {
                info!("Auto-refresh stopped");
                return tokens;
            }
        }

        match refresher.refresh(&tokens.refresh_token).await {
            Ok(next) => {
                attempt = 0;
                tokens = next;
                on_refresh(&tokens);
                wait = policy.refresh_after(tokens.expires_in);
                info!("Session refreshed, next refresh in {:?}", wait);
            }
            Err(e) => {
                attempt += 1;
                wait = policy.retry_delay(attempt);
                warn!("Session refresh attempt {} failed: {}; retrying in {:?}", attempt, e, wait);
            }
        }
    }
}
