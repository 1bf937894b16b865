use serde_json::json;

use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    match output_format {
        OutputFormat::Json => output_json(&json!({ "config": config })),
        OutputFormat::Text => {
            println!("Environment:   {:?}", config.environment);
            println!("Listen:        {}:{}", config.server.host, config.server.port);
            println!("Pages:         {}", config.server.pages_dir.display());
            println!("Backend:       {}", config.backend.url.as_deref().unwrap_or("(not configured)"));
            if let Some(secs) = config.backend.timeout_secs {
                println!("Timeout:       {}s", secs);
            }
            println!("Max body:      {} bytes", config.backend.max_request_size_bytes);
            println!("Auth0 domain:  {}", config.auth.domain.as_deref().unwrap_or("(not configured)"));
            println!("Client ID:     {}", config.auth.client_id.as_deref().unwrap_or("(not configured)"));
            println!("Audience:      {}", config.auth.audience.as_deref().unwrap_or("(none)"));
            println!("Roles claim:   {}", config.auth.roles_claim);
            println!("Secure cookie: {}", config.security.require_https);
            Ok(())
        }
    }
}
