use alloy_primitives::{Address, B256};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::indexer::rpc::{ArgFilter, LogQuery, LogSource};
use crate::models::common::{BlockRange, ChunkingConfig};
use crate::models::datasets::deposits::RawDepositLog;
use crate::models::errors::ScanError;

/// How a block range is split into `eth_getLogs` calls.
///
/// Ranges whose span (`end - start`) is below `single_call_span` go out as one call.
/// Anything wider is walked in `blocks_per_chunk`-sized pieces, one block each by default,
/// since many providers cap the block span of a log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    single_call_span: u64,
    blocks_per_chunk: u64,
    max_concurrent_fetches: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            single_call_span: config.single_call_span,
            blocks_per_chunk: config.blocks_per_chunk,
            max_concurrent_fetches: config.max_concurrent_fetches,
        }
    }
}

impl ChunkPolicy {
    pub fn new(
        single_call_span: u64,
        blocks_per_chunk: u64,
        max_concurrent_fetches: usize,
    ) -> Result<Self, ScanError> {
        if blocks_per_chunk == 0 {
            return Err(ScanError::InvalidChunkPolicy(
                "blocks_per_chunk must be greater than 0",
            ));
        }
        if max_concurrent_fetches == 0 {
            return Err(ScanError::InvalidChunkPolicy(
                "max_concurrent_fetches must be greater than 0",
            ));
        }
        Ok(Self {
            single_call_span,
            blocks_per_chunk,
            max_concurrent_fetches,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ScanError> {
        Self::new(
            config.single_call_span,
            config.blocks_per_chunk,
            config.max_concurrent_fetches,
        )
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    /// Sub-ranges in ascending order, covering `range` exactly once.
    pub fn plan(&self, range: BlockRange) -> Vec<BlockRange> {
        if range.span() < self.single_call_span {
            return vec![range];
        }

        let mut chunks = Vec::new();
        let mut start = range.start();
        loop {
            let end = start
                .saturating_add(self.blocks_per_chunk - 1)
                .min(range.end());
            chunks.push(BlockRange::ordered(start, end));
            if end == range.end() {
                break;
            }
            start = end + 1;
        }
        chunks
    }
}

/// Fetches every chunk of `range` and concatenates the logs in ascending block order.
///
/// The first failing chunk aborts the whole fetch. With `max_concurrent_fetches > 1` several
/// chunks may be in flight, but results are still buffered and returned in chunk order.
pub async fn fetch_chunks<S: LogSource + ?Sized>(
    source: &S,
    policy: &ChunkPolicy,
    range: BlockRange,
    contract_address: Address,
    event_signature: B256,
    arg_filter: ArgFilter,
) -> Result<Vec<RawDepositLog>, ScanError> {
    let chunks = policy.plan(range);
    debug!("Fetching blocks {} in {} chunk(s)", range, chunks.len());

    let per_chunk: Vec<Vec<RawDepositLog>> = stream::iter(chunks)
        .map(|chunk| {
            let query = LogQuery {
                contract_address,
                event_signature,
                arg_filter,
                from_block: chunk.start(),
                to_block: chunk.end(),
            };
            async move {
                source
                    .get_logs(&query)
                    .await
                    .map_err(|e| ScanError::Fetch {
                        range: chunk,
                        source: e,
                    })
            }
        })
        .buffered(policy.max_concurrent_fetches)
        .try_collect()
        .await?;

    Ok(per_chunk.into_iter().flatten().collect())
}
