use alloy_primitives::B256;
use thiserror::Error;

use crate::models::common::BlockRange;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Unsupported chain: {chain}")]
    UnsupportedChain { chain: String },
    #[error("Invalid contract address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Invalid block range: end_block {end} < start_block {start}")]
    InvalidRange { start: u64, end: u64 },
    #[error("Invalid chunk policy: {0}")]
    InvalidChunkPolicy(&'static str),
    #[error("Failed to resolve latest block height")]
    BlockHeight(#[source] FetchError),
    #[error("Failed to fetch logs for blocks {range}")]
    Fetch {
        range: BlockRange,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("RPC error calling {method}: {message}")]
    Rpc {
        method: &'static str,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Missing required field in log: {field}")]
    MissingField { field: &'static str },
    #[error("Unexpected topic count: expected {expected}, got {got}")]
    TopicCount { expected: usize, got: usize },
    #[error("Log is not a Deposit event, topic0 is {got}")]
    UnexpectedSignature { got: B256 },
    #[error("Failed to decode Deposit event: {0}")]
    Abi(#[from] alloy_sol_types::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write event log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize deposit rows: {0}")]
    Csv(#[from] csv::Error),
}
