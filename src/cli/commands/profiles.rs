use clap::Subcommand;
use reqwest::Method;
use serde_json::json;

use crate::cli::client::{unwrap_data, ApiClient};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "List all profiles")]
    List,

    #[command(about = "Create or replace your profile")]
    Set {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Avatar number")]
        avatar: Option<i32>,
    },
}

pub async fn handle(cmd: ProfileCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProfileCommands::List => {
            let profiles = unwrap_data(client.get("profiles", false).await?);
            let Some(items) = profiles.as_array() else {
                return output_data(&output_format, &profiles);
            };
            if items.is_empty() {
                return output_empty_collection(&output_format, "profiles", "No profiles");
            }
            match output_format {
                OutputFormat::Json => output_data(&output_format, &profiles),
                OutputFormat::Text => {
                    println!("{:<8} {}", "ID", "USERNAME");
                    println!("{}", "-".repeat(40));
                    for profile in items {
                        println!("{:<8} {}", profile["id"], profile["username"].as_str().unwrap_or(""));
                    }
                    Ok(())
                }
            }
        }
        ProfileCommands::Set { username, avatar } => {
            let body = json!({ "username": username, "avatar_url": avatar });
            let profile = unwrap_data(client.send(Method::PUT, "profiles/me", Some(&body), true).await?);
            output_data(&output_format, &profile)
        }
    }
}
