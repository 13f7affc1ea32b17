#![allow(dead_code)]

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::{SolEvent, SolValue};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use deposit_scanner::{Deposit, FetchError, LogQuery, LogSource, RawDepositLog};

pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const TOKEN: Address = Address::repeat_byte(0x11);
pub const RECIPIENT: Address = Address::repeat_byte(0x22);

pub fn deposit_log(block_number: u64, log_index: u64, amount: u64) -> RawDepositLog {
    RawDepositLog {
        block_number: Some(block_number),
        log_index: Some(log_index),
        transaction_hash: Some(B256::left_padding_from(&block_number.to_be_bytes())),
        address: CONTRACT.parse().unwrap(),
        topics: vec![
            Deposit::SIGNATURE_HASH,
            TOKEN.into_word(),
            RECIPIENT.into_word(),
        ],
        data: Bytes::from(U256::from(amount).abi_encode()),
    }
}

/// In-memory RPC collaborator that records every call it receives.
#[derive(Default)]
pub struct MockLogSource {
    heights: Mutex<VecDeque<u64>>,
    logs: BTreeMap<u64, Vec<RawDepositLog>>,
    fail_at: Option<u64>,
    // Slows down lower blocks so concurrent fetches complete out of order
    reverse_latency: bool,
    queries: Mutex<Vec<LogQuery>>,
    height_calls: AtomicUsize,
}

impl MockLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heights returned by successive `current_block_height` calls; the last one repeats.
    pub fn with_heights(self, heights: impl IntoIterator<Item = u64>) -> Self {
        *self.heights.lock().unwrap() = heights.into_iter().collect();
        self
    }

    pub fn with_log(mut self, log: RawDepositLog) -> Self {
        let block = log.block_number.expect("test logs carry a block number");
        self.logs.entry(block).or_default().push(log);
        self
    }

    pub fn failing_at(mut self, block: u64) -> Self {
        self.fail_at = Some(block);
        self
    }

    pub fn with_reverse_latency(mut self) -> Self {
        self.reverse_latency = true;
        self
    }

    pub fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn get_logs_calls(&self) -> Vec<(u64, u64)> {
        self.queries()
            .iter()
            .map(|q| (q.from_block, q.to_block))
            .collect()
    }

    pub fn height_calls(&self) -> usize {
        self.height_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn current_block_height(&self) -> Result<u64, FetchError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        let mut heights = self.heights.lock().unwrap();
        let height = if heights.len() > 1 {
            heights.pop_front()
        } else {
            heights.front().copied()
        };
        height.ok_or(FetchError::Rpc {
            method: "eth_blockNumber",
            message: "no height configured".to_string(),
        })
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawDepositLog>, FetchError> {
        self.queries.lock().unwrap().push(*query);

        if self.reverse_latency {
            let delay = 60u64.saturating_sub(query.from_block % 60);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(block) = self.fail_at {
            if (query.from_block..=query.to_block).contains(&block) {
                return Err(FetchError::Rpc {
                    method: "eth_getLogs",
                    message: format!("block range too large at {block}"),
                });
            }
        }

        Ok(self
            .logs
            .range(query.from_block..=query.to_block)
            .flat_map(|(_, logs)| logs.iter().cloned())
            .collect())
    }
}

/// Per-test scratch directory, removed on drop.
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "deposit-scanner-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).expect("create test dir");
        Self { path }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
