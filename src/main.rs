use booking_gateway::cli::{self, utils::output_error, Cli, OutputFormat};
use booking_gateway::logging;
use clap::Parser;

#[tokio::main]
async fn main() {
    // Load .env if present so local runs pick up AUTH0_* and BACKEND_URL
    let _ = dotenvy::dotenv();

    logging::init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = cli::run(cli).await {
        let _ = output_error(&output_format, &format!("{:#}", e));
        std::process::exit(1);
    }
}
