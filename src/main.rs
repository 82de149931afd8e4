//! Dropship core worker.
//!
//! ```text
//!   ┌──────────────────────── dropship-core ────────────────────────┐
//!   │                                                                │
//!   │  credential renewal ──▶ OAuth token endpoint                   │
//!   │        │                                                       │
//!   │        ▼                                                       │
//!   │  CredentialManager ◀── AuthorizedClient (401 → forced refresh) │
//!   │                                                                │
//!   │  product sync ──▶ ResilientFetcher ──▶ storefront / proxy      │
//!   │        │                 │                                     │
//!   │        │                 ▼                                     │
//!   │        │          FieldExtractor                               │
//!   │        ▼                                                       │
//!   │  dashboard API (POST {name, price})                            │
//!   └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use dropship_core::config::load_config;
use dropship_core::lifecycle::{signals, Services, Shutdown};
use dropship_core::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dropship-core")]
#[command(about = "Keeps the marketplace token fresh and syncs product prices", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "dropship.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init(&config.observability);

    tracing::info!(config = %args.config.display(), "dropship-core v0.1.0 starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let services = Services::build(config)?;
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    if let Some(credentials) = &services.credentials {
        tasks.push(credentials.spawn_renewal(services.renewal_interval, shutdown.subscribe()));
    }

    if services.sync_enabled {
        let sync = services.sync.clone();
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move { sync.run(rx).await }));
    }

    if tasks.is_empty() {
        tracing::warn!("Nothing to do: credential and sync are both disabled");
        return Ok(());
    }

    signals::listen(&shutdown).await;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task panicked");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
