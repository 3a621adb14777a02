use clap::Subcommand;
use tokio::sync::watch;

use crate::cli::client::ApiClient;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::provider::{run_auto_refresh, RefreshPolicy, SessionTokens};

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Keep a session alive, refreshing it until Ctrl-C")]
    Keepalive {
        #[arg(long, env = "JOURNAL_REFRESH_TOKEN", hide_env_values = true, help = "Refresh token")]
        refresh_token: String,
        #[arg(long, default_value_t = 3600, help = "Seconds until the current access token expires")]
        expires_in: u64,
    },
}

pub async fn handle(cmd: SessionCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SessionCommands::Keepalive { refresh_token, expires_in } => {
            let initial = SessionTokens {
                access_token: String::new(),
                refresh_token,
                expires_in,
            };

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(true);
                }
            });

            let format = output_format.clone();
            let on_refresh = move |tokens: &SessionTokens| {
                let printed = match format {
                    OutputFormat::Json => serde_json::to_string(tokens).map(|line| println!("{}", line)),
                    OutputFormat::Text => {
                        println!("export JOURNAL_TOKEN={}", tokens.access_token);
                        println!("export JOURNAL_REFRESH_TOKEN={}", tokens.refresh_token);
                        Ok(())
                    }
                };
                if let Err(e) = printed {
                    tracing::warn!("Failed to print refreshed session: {}", e);
                }
            };

            let last = run_auto_refresh(client, initial, &RefreshPolicy::default(), on_refresh, shutdown_rx).await;
            output_success(
                &output_format,
                "Keepalive stopped",
                Some(serde_json::json!({ "refresh_token": last.refresh_token })),
            )
        }
    }
}
