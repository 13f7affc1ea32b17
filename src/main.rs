use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use deposit_scanner::metrics::Metrics;
use deposit_scanner::utils::load_config;
use deposit_scanner::{ChunkPolicy, CsvSink, EventScanner, RpcLogSource, ScanError, ScanRequest};

const CONFIG_FILE: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    let config = match load_config(CONFIG_FILE) {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Err(e);
        }
    };

    // Initialize optional metrics
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(Metrics::new()?);
        metrics
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await?;
        Some(metrics)
    } else {
        info!("Metrics are disabled");
        None
    };

    // One RPC source per configured chain
    let mut sources = HashMap::with_capacity(config.chains.len());
    for (chain, chain_config) in &config.chains {
        info!("RPC URL for {}: {}", chain, chain_config.rpc_url);
        sources.insert(
            *chain,
            RpcLogSource::connect(*chain, chain_config, metrics.clone())?,
        );
    }

    let policy = ChunkPolicy::from_config(&config.chunking)?;
    let request = ScanRequest::from_config(&config.scan)?;
    info!("Event log file: {}", config.output_path);

    let mut scanner = EventScanner::new(sources, CsvSink::new(&config.output_path))
        .with_chunk_policy(policy)
        .with_metrics(metrics);

    println!();
    info!("========================= STARTING SCANNER =========================");

    if config.follow.enabled {
        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C signal");
        };
        return scanner
            .follow(&request, &config.follow, shutdown)
            .await
            .context("follow mode stopped on a failed scan");
    }

    match scanner.scan(&request).await {
        Ok(result) => {
            info!(
                "Scan complete: {} records written for blocks {}",
                result.records_written, result.range_used
            );
            Ok(())
        }
        // Reported, not fatal: nothing was fetched or written
        Err(ScanError::InvalidRange { start, end }) => {
            info!("Nothing scanned, requested range {} - {} is empty", start, end);
            Ok(())
        }
        Err(e) => Err(anyhow!(e).context("scan failed")),
    }
}
