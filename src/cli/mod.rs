pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "journal")]
#[command(about = "Journal CLI - Command-line interface for the Journal Backend API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "JOURNAL_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the API server"
    )]
    pub server: String,

    #[arg(long, global = true, env = "JOURNAL_TOKEN", hide_env_values = true, help = "Bearer token")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign in, sign up and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Journal, moon and relationship-check entries")]
    Entries {
        #[command(subcommand)]
        cmd: commands::entries::EntryCommands,
    },

    #[command(about = "User profiles")]
    Profiles {
        #[command(subcommand)]
        cmd: commands::profiles::ProfileCommands,
    },

    #[command(about = "Pre-key bundle registration and claims")]
    Keys {
        #[command(subcommand)]
        cmd: commands::keys::KeyCommands,
    },

    #[command(about = "Long-running session helpers")]
    Session {
        #[command(subcommand)]
        cmd: commands::session::SessionCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.server, cli.token)?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &client, output_format).await,
        Commands::Entries { cmd } => commands::entries::handle(cmd, &client, output_format).await,
        Commands::Profiles { cmd } => commands::profiles::handle(cmd, &client, output_format).await,
        Commands::Keys { cmd } => commands::keys::handle(cmd, &client, output_format).await,
        Commands::Session { cmd } => commands::session::handle(cmd, &client, output_format).await,
    }
}
