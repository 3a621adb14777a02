use clap::Subcommand;

use crate::cli::client::{unwrap_data, ApiClient};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum KeyCommands {
    #[command(about = "Register a pre-key bundle read as JSON from stdin")]
    Register,

    #[command(about = "Claim a user's bundle (consumes one one-time pre-key)")]
    Claim {
        #[arg(help = "Bundle identity")]
        user_id: String,
    },

    #[command(about = "Count a user's remaining one-time pre-keys")]
    Count {
        #[arg(help = "Bundle identity")]
        user_id: String,
    },
}

pub async fn handle(cmd: KeyCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        KeyCommands::Register => {
            let bundle = read_stdin_json()?;
            let stored = unwrap_data(client.post("keys/bundle", &bundle, true).await?);
            match output_format {
                OutputFormat::Json => output_data(&output_format, &stored),
                OutputFormat::Text => {
                    let identity = stored["userId"].as_str().unwrap_or("?");
                    output_success(&output_format, &format!("Bundle registered as {}", identity), None)
                }
            }
        }
        KeyCommands::Claim { user_id } => {
            let claimed = unwrap_data(client.get(&format!("keys/bundle/{}", user_id), true).await?);
            output_data(&output_format, &claimed)
        }
        KeyCommands::Count { user_id } => {
            let count = unwrap_data(client.get(&format!("keys/bundle/{}/count", user_id), true).await?);
            match output_format {
                OutputFormat::Json => output_data(&output_format, &count),
                OutputFormat::Text => {
                    println!("{} one-time pre-keys left for {}", count["count"], user_id);
                    Ok(())
                }
            }
        }
    }
}
