use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::models::errors::ScanError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0".to_string(),
            port: 9100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    // Chains with non-standard consensus header fields (AVAX C-chain, BSC)
    #[serde(default)]
    pub poa: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub chain: String,
    pub start_block: BlockBound,
    pub end_block: BlockBound,
    pub contract_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub single_call_span: u64,
    pub blocks_per_chunk: u64,
    pub max_concurrent_fetches: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            single_call_span: 30,
            blocks_per_chunk: 1,
            max_concurrent_fetches: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    pub chain_tip_buffer: u64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: 1000,
            chain_tip_buffer: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub output_path: String,
    pub scan: ScanConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub follow: FollowConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub chains: HashMap<Chain, ChainConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Avax,
    Bsc,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avax => "avax",
            Self::Bsc => "bsc",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avax" => Ok(Self::Avax),
            "bsc" => Ok(Self::Bsc),
            _ => Err(ScanError::UnsupportedChain {
                chain: s.to_string(),
            }),
        }
    }
}

/// A block bound as given by the caller: a concrete height or the chain tip at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockBound {
    Number(u64),
    Latest,
}

impl FromStr for BlockBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.parse::<u64>()
            .map(Self::Number)
            .map_err(|_| format!("expected a block number or \"latest\", got {s:?}"))
    }
}

impl From<u64> for BlockBound {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl Serialize for BlockBound {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Number(n) => serializer.serialize_u64(*n),
            Self::Latest => serializer.serialize_str("latest"),
        }
    }
}

impl<'de> Deserialize<'de> for BlockBound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Env overrides arrive as strings, config files may carry plain integers
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawBound {
            Number(u64),
            Text(String),
        }

        match RawBound::deserialize(deserializer)? {
            RawBound::Number(n) => Ok(Self::Number(n)),
            RawBound::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Inclusive block range. `start <= end` always holds, `new` is the only public way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRange {
    start: u64,
    end: u64,
}

impl BlockRange {
    pub fn new(start: u64, end: u64) -> Result<Self, ScanError> {
        if end < start {
            return Err(ScanError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    // Callers must have checked `start <= end`
    pub(crate) fn ordered(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Distance between the bounds, `end - start`.
    pub fn span(&self) -> u64 {
        self.end - self.start
    }

    pub fn block_count(&self) -> u64 {
        self.span() + 1
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} - {}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    chain: Chain,
    start_block: BlockBound,
    end_block: BlockBound,
    contract_address: Address,
}

impl ScanRequest {
    pub fn new(
        chain: &str,
        start_block: impl Into<BlockBound>,
        end_block: impl Into<BlockBound>,
        contract_address: &str,
    ) -> Result<Self, ScanError> {
        let chain = chain.parse::<Chain>()?;
        let contract_address =
            contract_address
                .parse::<Address>()
                .map_err(|e| ScanError::InvalidAddress {
                    address: contract_address.to_string(),
                    reason: e.to_string(),
                })?;

        Ok(Self {
            chain,
            start_block: start_block.into(),
            end_block: end_block.into(),
            contract_address,
        })
    }

    pub fn from_config(scan: &ScanConfig) -> Result<Self, ScanError> {
        Self::new(
            &scan.chain,
            scan.start_block,
            scan.end_block,
            &scan.contract_address,
        )
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn start_block(&self) -> BlockBound {
        self.start_block
    }

    pub fn end_block(&self) -> BlockBound {
        self.end_block
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Same chain and contract, concrete bounds.
    pub fn with_range(&self, range: BlockRange) -> Self {
        Self {
            start_block: BlockBound::Number(range.start()),
            end_block: BlockBound::Number(range.end()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    pub records_written: usize,
    pub range_used: BlockRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    RangeResolved(BlockRange),
    Fetching(BlockRange),
    Normalizing { range: BlockRange, logs: usize },
    Written(ScanResult),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_range_rejects_end_before_start() {
        let range = BlockRange::new(5, 9).unwrap();
        assert_eq!((range.start(), range.end()), (5, 9));
        assert_eq!(range.block_count(), 5);
        assert_eq!(BlockRange::new(7, 7).unwrap().span(), 0);
        assert!(matches!(
            BlockRange::new(9, 5),
            Err(ScanError::InvalidRange { start: 9, end: 5 })
        ));
    }

    #[test]
    fn inverted_range_cannot_be_built() {
        for (start, end) in [(10, 5), (1, 0), (u64::MAX, 0)] {
            match BlockRange::new(start, end) {
                Err(ScanError::InvalidRange { start: s, end: e }) => {
                    assert_eq!((s, e), (start, end))
                }
                other => panic!("expected InvalidRange for {start} - {end}, got {other:?}"),
            }
        }
        let full = BlockRange::new(0, u64::MAX).unwrap();
        assert_eq!(full.span(), u64::MAX);
    }

    #[test]
    fn block_bound_serializes_like_config_input() {
        assert_eq!(serde_json::to_string(&BlockBound::Number(5)).unwrap(), "5");
        assert_eq!(
            serde_json::to_string(&BlockBound::Latest).unwrap(),
            "\"latest\""
        );
        for bound in [BlockBound::Number(0), BlockBound::Number(u64::MAX), BlockBound::Latest] {
            let json = serde_json::to_string(&bound).unwrap();
            assert_eq!(serde_json::from_str::<BlockBound>(&json).unwrap(), bound);
        }
        assert_eq!(
            serde_json::from_str::<BlockBound>("\"1200\"").unwrap(),
            BlockBound::Number(1200)
        );
    }

    #[test]
    fn block_bound_parses_numbers_and_latest() {
        assert_eq!("latest".parse::<BlockBound>(), Ok(BlockBound::Latest));
        assert_eq!("LATEST".parse::<BlockBound>(), Ok(BlockBound::Latest));
        assert_eq!(" 1200 ".parse::<BlockBound>(), Ok(BlockBound::Number(1200)));
        assert!("earliest".parse::<BlockBound>().is_err());
        assert!("-1".parse::<BlockBound>().is_err());
    }

    #[test]
    fn chain_names_round_trip() {
        for chain in [Chain::Avax, Chain::Bsc] {
            assert_eq!(chain.to_string().parse::<Chain>().unwrap(), chain);
        }
        assert!(matches!(
            "polygon".parse::<Chain>(),
            Err(ScanError::UnsupportedChain { chain }) if chain == "polygon"
        ));
    }

    #[test]
    fn request_with_range_pins_both_bounds() {
        let request = ScanRequest::new(
            "bsc",
            BlockBound::Latest,
            BlockBound::Latest,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
        )
        .unwrap();
        let pinned = request.with_range(BlockRange::new(10, 20).unwrap());
        assert_eq!(pinned.chain(), Chain::Bsc);
        assert_eq!(pinned.start_block(), BlockBound::Number(10));
        assert_eq!(pinned.end_block(), BlockBound::Number(20));
        assert_eq!(pinned.contract_address(), request.contract_address());
    }
}
