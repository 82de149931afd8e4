use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;

use dropship_core::config::load_config;
use dropship_core::lifecycle::Services;
use dropship_core::observability::logging;

#[derive(Parser)]
#[command(name = "dropship-cli")]
#[command(about = "One-shot tools for the dropship core", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "dropship.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the marketplace token and print it masked
    Token,
    /// Fetch a product page and print the extracted fields
    Fetch {
        url: String,
    },
    /// Extract fields from a saved HTML file
    Extract {
        file: PathBuf,
        /// Source URL recorded in the output
        #[arg(long, default_value = "file://local")]
        url: String,
    },
    /// Run one product sync pass
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(&config.observability);
    let services = Services::build(config)?;

    match cli.command {
        Commands::Token => {
            let credentials = services
                .credentials
                .ok_or("credential management is disabled; set EBAY_CLIENT_ID or [credential] enabled")?;
            let token = credentials.refresh().await?;
            print_json(&json!({
                "token": token.masked(),
                "expires_at": token.expires_at().to_rfc3339(),
            }))?;
        }
        Commands::Fetch { url } => {
            let page = services.fetcher.fetch(&url).await?;
            let product = services.extractor.extract(&page.body, &page.url);
            print_json(&json!({
                "status": page.status,
                "attempts": page.attempts,
                "product": product,
            }))?;
        }
        Commands::Extract { file, url } => {
            let html = std::fs::read_to_string(&file)?;
            let product = services.extractor.extract(&html, &url);
            print_json(&serde_json::to_value(&product)?)?;
        }
        Commands::Sync => {
            let report = services.sync.sync_once().await;
            print_json(&serde_json::to_value(&report)?)?;
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
