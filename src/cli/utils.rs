use std::io::Read;

use anyhow::Context;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(obj)) = (data, response.as_object_mut()) {
                obj.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a payload: pretty JSON in json mode, otherwise a `key: value` listing
/// for objects and one line per element for arrays.
pub fn output_data(output_format: &OutputFormat, data: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => match data {
            Value::Array(items) if items.is_empty() => println!("(none)"),
            Value::Array(items) => {
                for item in items {
                    println!("{}", serde_json::to_string(item)?);
                }
            }
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::String(s) => println!("{}: {}", key, s),
                        other => println!("{}: {}", key, other),
                    }
                }
            }
            Value::Null => {}
            other => println!("{}", other),
        },
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Read a JSON document from stdin
pub fn read_stdin_json() -> anyhow::Result<Value> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    parse_json_input(&input)
}

fn parse_json_input(input: &str) -> anyhow::Result<Value> {
    if input.trim().is_empty() {
        anyhow::bail!("expected a JSON document on stdin");
    }
    serde_json::from_str(input).context("stdin is not valid JSON")
}

/// Merge `extra` into a JSON object, overwriting existing keys
pub fn with_fields(base: Value, extra: Value) -> anyhow::Result<Value> {
    match (base, extra) {
        (Value::Object(mut base), Value::Object(extra)) => {
            base.extend(extra);
            Ok(Value::Object(base))
        }
        _ => anyhow::bail!("expected a JSON object"),
    }
}
