pub mod chunking;
mod follow;
pub mod range;
pub mod rpc;
pub mod transformations;

use alloy_sol_types::SolEvent;
use opentelemetry::KeyValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::indexer::chunking::{ChunkPolicy, fetch_chunks};
use crate::indexer::range::resolve_range;
use crate::indexer::rpc::{ArgFilter, LogSource};
use crate::indexer::transformations::deposits::DepositTransformer;
use crate::metrics::Metrics;
use crate::models::common::{BlockBound, Chain, ScanRequest, ScanResult, ScanState};
use crate::models::datasets::deposits::{Deposit, RawDepositLog};
use crate::models::errors::ScanError;
use crate::storage::{DepositSink, write_records};

/// Scans a contract for `Deposit` events and appends them to a sink.
///
/// Each call to [`EventScanner::scan`] runs the whole pipeline
/// (resolve range, fetch, normalize, write) and either writes every row for the range
/// or none of them. Nothing is retried.
pub struct EventScanner<S, K> {
    sources: HashMap<Chain, S>,
    sink: K,
    policy: ChunkPolicy,
    arg_filter: ArgFilter,
    metrics: Option<Arc<Metrics>>,
    state: ScanState,
}

impl<S, K> EventScanner<S, K>
where
    S: LogSource,
    K: DepositSink,
{
    pub fn new(sources: HashMap<Chain, S>, sink: K) -> Self {
        Self {
            sources,
            sink,
            policy: ChunkPolicy::default(),
            arg_filter: ArgFilter::default(),
            metrics: None,
            state: ScanState::Idle,
        }
    }

    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_arg_filter(mut self, arg_filter: ArgFilter) -> Self {
        self.arg_filter = arg_filter;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn current_block_height(&self, chain: Chain) -> Result<u64, ScanError> {
        source_for(&self.sources, chain)?
            .current_block_height()
            .await
            .map_err(ScanError::BlockHeight)
    }

    /// Builds the request from raw caller input and scans it.
    pub async fn scan_blocks(
        &mut self,
        chain: &str,
        start_block: impl Into<BlockBound>,
        end_block: impl Into<BlockBound>,
        contract_address: &str,
    ) -> Result<ScanResult, ScanError> {
        let request = ScanRequest::new(chain, start_block, end_block, contract_address)
            .inspect_err(|e| set_state(&mut self.state, ScanState::Failed(e.to_string())))?;
        self.scan(&request).await
    }

    pub async fn scan(&mut self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let Self {
            sources,
            sink,
            policy,
            arg_filter,
            metrics,
            state,
        } = self;
        set_state(state, ScanState::Idle);

        let result = run_scan(
            sources,
            sink,
            policy,
            *arg_filter,
            metrics.as_deref(),
            state,
            request,
        )
        .await;

        match &result {
            Ok(_) => set_state(state, ScanState::Idle),
            Err(e) => set_state(state, ScanState::Failed(e.to_string())),
        }
        result
    }
}

async fn run_scan<S: LogSource, K: DepositSink>(
    sources: &HashMap<Chain, S>,
    sink: &K,
    policy: &ChunkPolicy,
    arg_filter: ArgFilter,
    metrics: Option<&Metrics>,
    state: &mut ScanState,
    request: &ScanRequest,
) -> Result<ScanResult, ScanError> {
    let chain = request.chain();
    let source = source_for(sources, chain)?;

    let range = resolve_range(source, request.start_block(), request.end_block()).await?;
    set_state(state, ScanState::RangeResolved(range));
    if range.start() == range.end() {
        info!("Scanning block {} on {}", range.start(), chain);
    } else {
        info!(
            "Scanning blocks {} - {} on {}",
            range.start(),
            range.end(),
            chain
        );
    }

    set_state(state, ScanState::Fetching(range));
    let logs = fetch_chunks(
        source,
        policy,
        range,
        request.contract_address(),
        Deposit::SIGNATURE_HASH,
        arg_filter,
    )
    .await?;

    set_state(
        state,
        ScanState::Normalizing {
            range,
            logs: logs.len(),
        },
    );
    let records = <RawDepositLog as DepositTransformer>::transform_deposits(
        logs,
        chain,
        request.contract_address(),
    )?;

    let records_written = write_records(sink, &records)?;
    let result = ScanResult {
        records_written,
        range_used: range,
    };
    set_state(state, ScanState::Written(result));
    info!(
        "Wrote {} deposit records for blocks {} on {}",
        records_written, range, chain
    );

    if let Some(metrics) = metrics {
        let attributes = [KeyValue::new("chain", chain.as_str())];
        metrics
            .blocks_scanned
            .add(range.block_count(), &attributes);
        metrics
            .records_written
            .add(records_written as u64, &attributes);
        metrics.latest_scanned_block.record(range.end(), &attributes);
    }

    Ok(result)
}

fn source_for<S>(sources: &HashMap<Chain, S>, chain: Chain) -> Result<&S, ScanError> {
    sources.get(&chain).ok_or_else(|| ScanError::UnsupportedChain {
        chain: chain.to_string(),
    })
}

fn set_state(state: &mut ScanState, next: ScanState) {
    debug!("Scanner state: {:?} -> {:?}", state, next);
    *state = next;
}
