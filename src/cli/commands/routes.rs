use serde_json::json;

use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::proxy::{ProxyMethod, PROXY_ROUTES};

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(&json!({ "routes": PROXY_ROUTES })),
        OutputFormat::Text => {
            for route in PROXY_ROUTES {
                let methods: Vec<&str> = route.methods.iter().map(|m| ProxyMethod::as_str(*m)).collect();
                println!("{:<18} {:<50} -> {}", methods.join(","), route.path, route.backend);
            }
            Ok(())
        }
    }
}
