use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use axum::{Router, http::StatusCode, routing::get};
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,

    // Scan metrics
    pub blocks_scanned: Counter<u64>,
    pub records_written: Counter<u64>,
    pub latest_scanned_block: Gauge<u64>,

    // Chain metrics
    pub chain_tip_block: Gauge<u64>,

    // RPC metrics
    pub rpc_requests: Counter<u64>,
    pub rpc_errors: Counter<u64>,
    pub rpc_latency: Histogram<f64>,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricError> {
        let registry = prometheus::Registry::new();

        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("scanner_metrics");

        let blocks_scanned = meter
            .u64_counter("scanner_blocks_scanned")
            .with_description("Total number of blocks covered by completed scans")
            .build();

        let records_written = meter
            .u64_counter("scanner_records_written")
            .with_description("Total number of deposit rows appended to the event log")
            .build();

        let latest_scanned_block = meter
            .u64_gauge("scanner_latest_scanned_block_number")
            .with_description("Last block of the latest completed scan")
            .build();

        let chain_tip_block = meter
            .u64_gauge("scanner_chain_tip_block_number")
            .with_description("Latest block number on chain")
            .build();

        let rpc_requests = meter
            .u64_counter("scanner_rpc_requests")
            .with_description("Number of RPC requests made")
            .build();

        let rpc_errors = meter
            .u64_counter("scanner_rpc_errors")
            .with_description("Number of RPC errors encountered")
            .build();

        let rpc_latency = meter
            .f64_histogram("scanner_rpc_latency")
            .with_description("RPC request latency")
            .with_boundaries(vec![
                0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 5.0, 10.0,
            ])
            .with_unit("s")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            blocks_scanned,
            records_written,
            latest_scanned_block,
            chain_tip_block,
            rpc_requests,
            rpc_errors,
            rpc_latency,
        })
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) -> Result<()> {
        let addr = format!("{addr}:{port}")
            .parse::<SocketAddr>()
            .context("invalid metrics bind address")?;
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().is_unspecified() {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind metrics server to {addr}"))?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server stopped: {}", e);
            }
        });

        Ok(())
    }
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
