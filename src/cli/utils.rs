use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;

/// Pretty JSON on stdout
pub fn output_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(&json!({
            "success": false,
            "error": message
        })),
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
            Ok(())
        }
    }
}
