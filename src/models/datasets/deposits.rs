use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::sol;
use serde::Serialize;

sol! {
    /// Emitted by the bridge contract when tokens are locked for the other side.
    #[derive(Debug, PartialEq, Eq)]
    event Deposit(address indexed token, address indexed recipient, uint256 amount);
}

////////////////////////////////////// RPC Data ////////////////////////////////////////
// A single log as returned by eth_getLogs, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDepositLog {
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
    // Emitting contract. Records carry the scanned address, this one is only logged.
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/////////////////////////////////// Transformed Data ///////////////////////////////////
// One row of the event log file. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub chain: String,
    pub token: String,
    pub recipient: String,
    pub amount: String,
    pub transaction_hash: String,
    pub address: String,
}

pub const DEPOSIT_COLUMNS: [&str; 6] = [
    "chain",
    "token",
    "recipient",
    "amount",
    "transactionHash",
    "address",
];
