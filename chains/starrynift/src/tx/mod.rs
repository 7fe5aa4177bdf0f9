//! Transaction submission and confirmation.

pub mod calldata;
pub mod submitter;
pub mod waiter;

pub use submitter::TransactionSubmitter;
pub use waiter::{ConfirmationWaiter, WaitOutcome};

use crate::chain::Chain;
use anyhow::{anyhow, Result};
use ethers::types::{Address, Bytes, H256, U256};

/// A single transaction to build, sign and broadcast.
///
/// Unset fee, gas and nonce are resolved from the chain at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub chain: Chain,
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub gas_price: Option<U256>,
    pub gas_limit: Option<U256>,
    pub nonce: Option<U256>,
}

impl TxRequest {
    pub fn new(chain: Chain, from: Address, to: Address, data: Bytes) -> Self {
        Self {
            chain,
            from,
            to,
            data,
            gas_price: None,
            gas_limit: None,
            nonce: None,
        }
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Terminal result of a submission: a confirmed hash or a failure reason,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed { tx_hash: H256 },
    Failed { reason: String },
}

impl TxOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        TxOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Confirmed { .. })
    }

    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            TxOutcome::Confirmed { tx_hash } => Some(*tx_hash),
            TxOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            TxOutcome::Confirmed { .. } => None,
            TxOutcome::Failed { reason } => Some(reason),
        }
    }

    /// Turns a failed outcome into an error so a retry wrapper can act on it.
    pub fn into_result(self) -> Result<H256> {
        match self {
            TxOutcome::Confirmed { tx_hash } => Ok(tx_hash),
            TxOutcome::Failed { reason } => Err(anyhow!(reason)),
        }
    }
}
