use clap::Subcommand;
use reqwest::Method;
use serde_json::json;

use crate::cli::client::{unwrap_data, ApiClient};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::EntryCategory;

#[derive(Subcommand)]
pub enum EntryCommands {
    #[command(about = "List your entries, newest first")]
    List {
        #[arg(long, help = "Only one category: 0 journal, 1 moon, 2 relationship check")]
        index: Option<i64>,
    },

    #[command(about = "Create an entry from JSON on stdin")]
    Create {
        #[arg(help = "Table: journal_entries, moon_entries or relationship_check")]
        table: EntryCategory,
    },

    #[command(about = "Update an entry with a partial JSON object on stdin")]
    Update {
        #[arg(help = "Table of the entry")]
        table: EntryCategory,
        #[arg(help = "Entry ID")]
        id: i64,
    },

    #[command(about = "Delete an entry")]
    Delete {
        #[arg(help = "Table of the entry")]
        table: EntryCategory,
        #[arg(help = "Entry ID")]
        id: i64,
    },
}

pub async fn handle(cmd: EntryCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EntryCommands::List { index } => {
            let path = match index {
                Some(index) => format!("entries?selected_index={}", index),
                None => "entries".to_string(),
            };
            let entries = unwrap_data(client.get(&path, true).await?);
            if entries.as_array().is_some_and(|items| items.is_empty()) {
                return output_empty_collection(&output_format, "entries", "No entries");
            }
            output_data(&output_format, &entries)
        }
        EntryCommands::Create { table } => {
            let body = with_fields(read_stdin_json()?, json!({ "table": table.table() }))?;
            let created = unwrap_data(client.post("entries", &body, true).await?);
            output_data(&output_format, &created)
        }
        EntryCommands::Update { table, id } => {
            let body = with_fields(read_stdin_json()?, json!({ "table": table.table(), "id": id }))?;
            let updated = unwrap_data(client.send(Method::PUT, "entries", Some(&body), true).await?);
            output_data(&output_format, &updated)
        }
        EntryCommands::Delete { table, id } => {
            let body = json!({ "table": table.table(), "id": id });
            client.send(Method::DELETE, "delete", Some(&body), true).await?;
            output_success(
                &output_format,
                &format!("Deleted {} entry {}", table, id),
                Some(json!({ "table": table.table(), "id": id })),
            )
        }
    }
}
