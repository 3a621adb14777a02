use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::{unwrap_data, ApiClient};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in with email and password")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "JOURNAL_PASSWORD", hide_env_values = true, help = "Password")]
        password: String,
    },

    #[command(about = "Sign out the current token")]
    Logout,

    #[command(about = "Trade a refresh token for a new session")]
    Refresh {
        #[arg(help = "Refresh token")]
        refresh_token: String,
    },

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Register new user")]
    Register {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "JOURNAL_PASSWORD", hide_env_values = true, help = "Password")]
        password: String,
        #[arg(long, help = "Create a profile with this username")]
        username: Option<String>,
    },
}

pub async fn handle(cmd: AuthCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let session = client
                .post("login", &json!({ "email": email, "password": password }), false)
                .await?;
            print_session(&output_format, "Logged in", &session)
        }
        AuthCommands::Logout => {
            client.post("logout", &json!({}), true).await?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Refresh { refresh_token } => {
            let session = client
                .post("refresh", &json!({ "refresh_token": refresh_token }), false)
                .await?;
            print_session(&output_format, "Session refreshed", &session)
        }
        AuthCommands::Whoami => {
            let user = unwrap_data(client.get("whoami", true).await?);
            output_data(&output_format, &user)
        }
        AuthCommands::Register { email, password, username } => {
            let mut body = json!({ "email": email, "password": password });
            if let Some(username) = username {
                body["username"] = json!(username);
            }
            let signup = client.post("register", &body, false).await?;
            match output_format {
                OutputFormat::Json => output_data(&output_format, &signup),
                OutputFormat::Text => output_success(&output_format, &format!("Registered {}", email), None),
            }
        }
    }
}

/// Text mode prints the tokens as shell exports so they can be eval'd
fn print_session(output_format: &OutputFormat, message: &str, session: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_data(output_format, session),
        OutputFormat::Text => {
            output_success(output_format, message, None)?;
            if let Some(token) = session["access_token"].as_str() {
                println!("export JOURNAL_TOKEN={}", token);
            }
            if let Some(token) = session["refresh_token"].as_str() {
                println!("export JOURNAL_REFRESH_TOKEN={}", token);
            }
            Ok(())
        }
    }
}
