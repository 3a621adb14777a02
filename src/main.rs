use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use journal_backend::config::{self, Environment};
use journal_backend::database::{DatabaseManager, MemoryStore, PgStore, Store};
use journal_backend::provider::{GoTrueClient, IdentityProvider};
use journal_backend::services::sweeper;
use journal_backend::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, PROVIDER_URL, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();

    let default_filter = match config.environment {
        Environment::Development => "journal_backend=debug,tower_http=info",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    info!("Starting Journal Backend in {:?} mode", config.environment);
    config.validate().context("invalid configuration")?;

    let store: Arc<dyn Store> = match &config.database.url {
        Some(_) => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let provider: Arc<dyn IdentityProvider> =
        Arc::new(GoTrueClient::new(&config.provider).context("failed to build provider client")?);

    let bind_addr = config.bind_addr();
    let moon = config.moon.clone();
    let state = AppState::new(config, store.clone(), provider);
    if state.authenticator.is_local() {
        info!("Verifying bearer tokens locally");
    } else {
        info!("Verifying bearer tokens with the identity provider");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = sweeper::spawn_let_go_sweeper(store, moon, shutdown_rx);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Journal Backend listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
