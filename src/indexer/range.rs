use tracing::error;

use crate::indexer::rpc::LogSource;
use crate::models::common::{BlockBound, BlockRange};
use crate::models::errors::ScanError;

/// Turns caller bounds into a concrete, validated range.
///
/// Each `Latest` bound is a separate height query, so a request with both bounds set to
/// `Latest` may observe two different tips.
pub async fn resolve_range<S: LogSource + ?Sized>(
    source: &S,
    start_block: BlockBound,
    end_block: BlockBound,
) -> Result<BlockRange, ScanError> {
    let start = resolve_bound(source, start_block).await?;
    let end = resolve_bound(source, end_block).await?;

    BlockRange::new(start, end).inspect_err(|_| {
        error!("Error end_block < start_block! end_block = {end}, start_block = {start}");
    })
}

async fn resolve_bound<S: LogSource + ?Sized>(
    source: &S,
    bound: BlockBound,
) -> Result<u64, ScanError> {
    match bound {
        BlockBound::Number(number) => Ok(number),
        BlockBound::Latest => source
            .current_block_height()
            .await
            .map_err(ScanError::BlockHeight),
    }
}
