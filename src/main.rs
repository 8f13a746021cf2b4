//! clipway - offline edge cache for match clips

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipway::{config::Args, origin::HttpOrigin, server, EdgeWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("clipway={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = args.worker_config()?;
    let policies = args.asset_policies()?;

    info!("======================================");
    info!("  clipway - offline edge cache");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Origin: {}", config.origin_url);
    info!("Probe: {} every {:?}", config.probe_url, config.probe_interval);
    info!("Namespace: {}", config.namespace);
    info!("Selection: {} -> {}", config.selection_endpoint, config.selection_redirect);
    info!(
        "Assets: {} listed, default {}",
        policies.len(),
        policies.default_policy().behavior.name()
    );
    info!("======================================");

    let origin = Arc::new(HttpOrigin::new()?);
    let worker = Arc::new(EdgeWorker::new(config, Arc::new(policies), origin));

    let report = worker.on_install().await;
    if !report.failed.is_empty() {
        warn!("{} asset(s) could not be pre-loaded: {:?}", report.failed.len(), report.failed);
    }
    worker.on_activate().await;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    };

    let result = server::run(Arc::clone(&worker), args.listen, shutdown).await;
    worker.shutdown().await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
