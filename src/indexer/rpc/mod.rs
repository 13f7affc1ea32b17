pub mod logs;

use alloy_eips::BlockNumberOrTag;
use alloy_network::{AnyNetwork, Ethereum};
use alloy_primitives::{Address, B256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::Filter;
use alloy_transport::TransportError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::indexer::rpc::logs::LogParser;
use crate::metrics::Metrics;
use crate::models::common::{Chain, ChainConfig};
use crate::models::datasets::deposits::RawDepositLog;
use crate::models::errors::FetchError;
use crate::utils::strip_html;

/// Optional filters on the indexed `Deposit` arguments. Empty matches every deposit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArgFilter {
    pub token: Option<Address>,
    pub recipient: Option<Address>,
}

/// One `eth_getLogs` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub contract_address: Address,
    pub event_signature: B256,
    pub arg_filter: ArgFilter,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new()
            .address(self.contract_address)
            .event_signature(self.event_signature)
            .from_block(BlockNumberOrTag::Number(self.from_block))
            .to_block(BlockNumberOrTag::Number(self.to_block));

        if let Some(token) = self.arg_filter.token {
            filter = filter.topic1(token.into_word());
        }
        if let Some(recipient) = self.arg_filter.recipient {
            filter = filter.topic2(recipient.into_word());
        }
        filter
    }
}

/// The RPC collaborator of the scanner, bound to a single chain.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn current_block_height(&self) -> Result<u64, FetchError>;

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawDepositLog>, FetchError>;
}

#[async_trait]
impl<S: LogSource + ?Sized> LogSource for Arc<S> {
    async fn current_block_height(&self) -> Result<u64, FetchError> {
        (**self).current_block_height().await
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawDepositLog>, FetchError> {
        (**self).get_logs(query).await
    }
}

// POA chains carry consensus fields the strict Ethereum types reject
#[derive(Clone)]
enum ChainProvider {
    Standard(DynProvider<Ethereum>),
    Poa(DynProvider<AnyNetwork>),
}

#[derive(Clone)]
pub struct RpcLogSource {
    chain: Chain,
    provider: ChainProvider,
    metrics: Option<Arc<Metrics>>,
}

impl RpcLogSource {
    pub fn connect(
        chain: Chain,
        chain_config: &ChainConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let rpc_url: Url = chain_config
            .rpc_url
            .parse()
            .with_context(|| format!("invalid RPC URL for {chain}: {}", chain_config.rpc_url))?;

        let provider = if chain_config.poa {
            ChainProvider::Poa(
                ProviderBuilder::new()
                    .network::<AnyNetwork>()
                    .connect_http(rpc_url)
                    .erased(),
            )
        } else {
            ChainProvider::Standard(ProviderBuilder::new().connect_http(rpc_url).erased())
        };

        Ok(Self {
            chain,
            provider,
            metrics,
        })
    }

    fn record<T>(
        &self,
        method: &'static str,
        start: Instant,
        result: Result<T, TransportError>,
    ) -> Result<T, FetchError> {
        if let Some(metrics) = &self.metrics {
            let attributes = [
                KeyValue::new("chain", self.chain.as_str()),
                KeyValue::new("method", method),
            ];
            metrics.rpc_requests.add(1, &attributes);
            metrics
                .rpc_latency
                .record(start.elapsed().as_secs_f64(), &attributes);
            if result.is_err() {
                metrics.rpc_errors.add(1, &attributes);
            }
        }

        result.map_err(|e| {
            warn!(
                "RPC call {} failed on {}. Error details:\n{:#?}",
                method, self.chain, e
            );
            FetchError::Rpc {
                method,
                message: strip_html(&e.to_string()),
            }
        })
    }
}

#[async_trait]
impl LogSource for RpcLogSource {
    async fn current_block_height(&self) -> Result<u64, FetchError> {
        let start = Instant::now();
        let result = match &self.provider {
            ChainProvider::Standard(provider) => provider.get_block_number().await,
            ChainProvider::Poa(provider) => provider.get_block_number().await,
        };
        let height = self.record("eth_blockNumber", start, result)?;

        if let Some(metrics) = &self.metrics {
            metrics.chain_tip_block.record(
                height,
                &[KeyValue::new("chain", self.chain.as_str())],
            );
        }
        Ok(height)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<RawDepositLog>, FetchError> {
        let filter = query.to_filter();
        let start = Instant::now();
        let result = match &self.provider {
            ChainProvider::Standard(provider) => provider.get_logs(&filter).await,
            ChainProvider::Poa(provider) => provider.get_logs(&filter).await,
        };
        let logs = self.record("eth_getLogs", start, result)?;

        debug!(
            "Fetched {} logs for blocks {}-{} on {}",
            logs.len(),
            query.from_block,
            query.to_block,
            self.chain
        );
        Ok(logs.parse_deposit_logs())
    }
}
