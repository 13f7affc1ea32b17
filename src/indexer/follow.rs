use std::future::Future;
use tokio::time::Duration;
use tracing::info;

use crate::indexer::EventScanner;
use crate::indexer::rpc::LogSource;
use crate::models::common::{BlockBound, BlockRange, FollowConfig, ScanRequest};
use crate::models::errors::ScanError;
use crate::storage::DepositSink;

impl<S, K> EventScanner<S, K>
where
    S: LogSource,
    K: DepositSink,
{
    /// Keeps scanning from the request's start block up to the chain tip minus
    /// `chain_tip_buffer`, one contiguous range per poll.
    ///
    /// Returns once a numeric `end_block` has been scanned or `shutdown` resolves. The first
    /// failed scan is returned as is. Progress lives only in memory.
    pub async fn follow<F>(
        &mut self,
        request: &ScanRequest,
        settings: &FollowConfig,
        shutdown: F,
    ) -> Result<(), ScanError>
    where
        F: Future<Output = ()>,
    {
        let chain = request.chain();
        let poll_interval = Duration::from_millis(settings.poll_interval_ms);
        tokio::pin!(shutdown);

        let mut next_block = match request.start_block() {
            BlockBound::Number(number) => number,
            BlockBound::Latest => self.current_block_height(chain).await?,
        };
        info!("Following {} from block {}", chain, next_block);

        loop {
            if let BlockBound::Number(end_block) = request.end_block() {
                if next_block > end_block {
                    info!("Reached end_block {}, stopping", end_block);
                    return Ok(());
                }
            }

            let latest_block = self.current_block_height(chain).await?;
            let safe_tip = latest_block.saturating_sub(settings.chain_tip_buffer);
            let end = match request.end_block() {
                BlockBound::Number(end_block) => safe_tip.min(end_block),
                BlockBound::Latest => safe_tip,
            };

            if next_block <= end {
                let result = self
                    .scan(&request.with_range(BlockRange::ordered(next_block, end)))
                    .await?;
                match result.range_used.end().checked_add(1) {
                    Some(block) => next_block = block,
                    None => return Ok(()),
                }
            } else {
                info!(
                    "Buffer limit reached. Waiting for block {} to be {} blocks behind tip {}",
                    next_block, settings.chain_tip_buffer, latest_block
                );
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scanner...");
                    return Ok(());
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}
