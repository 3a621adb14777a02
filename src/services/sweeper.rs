use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::MoonConfig;
use crate::database::{Store, StoreError};

/// Clear `let_go` on moon entries older than the configured TTL
pub async fn sweep_expired_let_go(store: &dyn Store, config: &MoonConfig) -> Result<u64, StoreError> {
    let cutoff = Utc::now() - chrono::Duration::hours(config.let_go_ttl_hours);
    let cleared = store.clear_expired_let_go(cutoff).await?;
    if cleared > 0 {
        info!("Cleared let_go on {} moon entries older than {}", cleared, cutoff);
    } else {
        debug!("No expired let_go values");
    }
    Ok(cleared)
}

/// Run the sweep on an interval until `shutdown` flips
pub fn spawn_let_go_sweeper(
    store: Arc<dyn Store>,
    config: MoonConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sweep_expired_let_go(store.as_ref(), &config).await {
                        error!("let_go sweep failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("let_go sweeper stopped");
                    return;
                }
            }
        }
    })
}
