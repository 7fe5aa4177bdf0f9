//! Chain access for the two networks the quest service lives on.
//!
//! [`ChainProvider`] is the narrow view of a node the transaction code needs.
//! [`RpcChainProvider`] backs it with an ethers HTTP provider, and
//! [`ChainRegistry`] maps each [`Chain`] to its provider. Both are shared
//! read-only by every lane.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use core_logic::config::ChainConfig;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    /// BNB Smart Chain, id 56.
    Bsc,
    /// opBNB, id 204.
    OpBnb,
}

impl Chain {
    pub const fn id(self) -> u64 {
        match self {
            Chain::Bsc => 56,
            Chain::OpBnb => 204,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Chain::Bsc => "BSC",
            Chain::OpBnb => "opBNB",
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            56 => Some(Chain::Bsc),
            204 => Some(Chain::OpBnb),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// What the node currently knows about a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Mined with status 1.
    Confirmed,
    /// Mined with a non-success status.
    Reverted,
    /// Receipt exists but carries no status yet.
    Pending,
    /// No receipt, whether or not the tx sits in the mempool.
    NotFound,
}

#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn receipt_status(&self, tx_hash: H256) -> Result<ReceiptStatus>;
    async fn gas_price(&self) -> Result<U256>;
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256>;
    async fn transaction_count(&self, address: Address) -> Result<U256>;
    async fn chain_id(&self) -> Result<U256>;
    /// Read-only `eth_call`.
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;
}

#[derive(Clone, Debug)]
pub struct RpcChainProvider<P = Http> {
    provider: Provider<P>,
}

impl RpcChainProvider<Http> {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let provider = Provider::new(Http::new_with_client(
            reqwest::Url::parse(rpc_url).with_context(|| format!("Invalid RPC URL {}", rpc_url))?,
            client,
        ));

        Ok(Self { provider })
    }
}

impl<P: JsonRpcClient> RpcChainProvider<P> {
    pub fn from_provider(provider: Provider<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> ChainProvider for RpcChainProvider<P> {
    /// A tx stuck in the mempool has no receipt and reports `NotFound`, so
    /// the waiter's deadline still applies to it.
    async fn receipt_status(&self, tx_hash: H256) -> Result<ReceiptStatus> {
        let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? else {
            return Ok(ReceiptStatus::NotFound);
        };
        Ok(match receipt.status {
            Some(status) if status == U64::from(1) => ReceiptStatus::Confirmed,
            Some(_) => ReceiptStatus::Reverted,
            None => ReceiptStatus::Pending,
        })
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        Ok(self.provider.estimate_gas(tx, None).await?)
    }

    async fn transaction_count(&self, address: Address) -> Result<U256> {
        Ok(self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn chain_id(&self) -> Result<U256> {
        Ok(self.provider.get_chainid().await?)
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes> {
        Ok(self.provider.call(tx, None).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }
}

/// Chain -> provider lookup. Built once per run.
#[derive(Clone, Default)]
pub struct ChainRegistry {
    providers: HashMap<Chain, Arc<dyn ChainProvider>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects an RPC provider for every configured chain this crate knows.
    pub fn connect(configs: &[ChainConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            let Some(chain) = Chain::from_id(config.chain_id) else {
                warn!(
                    "Ignoring chain '{}' with unsupported id {}",
                    config.name, config.chain_id
                );
                continue;
            };
            debug!("Connecting {} via {}", chain, config.rpc_endpoint);
            let provider = RpcChainProvider::new(&config.rpc_endpoint)?;
            registry = registry.with_provider(chain, Arc::new(provider));
        }
        Ok(registry)
    }

    pub fn with_provider(mut self, chain: Chain, provider: Arc<dyn ChainProvider>) -> Self {
        self.providers.insert(chain, provider);
        self
    }

    /// Asks every node for its chain id and rejects an RPC endpoint that
    /// serves a different network than the one it was registered for.
    pub async fn verify(&self) -> Result<()> {
        for (chain, provider) in &self.providers {
            let reported = provider
                .chain_id()
                .await
                .with_context(|| format!("Failed to read chain id for {}", chain))?;
            if reported != U256::from(chain.id()) {
                return Err(anyhow!(
                    "RPC for {} reports chain id {}",
                    chain,
                    reported
                ));
            }
            debug!("{} RPC verified", chain);
        }
        Ok(())
    }

    pub fn get(&self, chain: Chain) -> Result<Arc<dyn ChainProvider>> {
        self.providers
            .get(&chain)
            .cloned()
            .ok_or_else(|| anyhow!("No provider configured for {}", chain))
    }
}
