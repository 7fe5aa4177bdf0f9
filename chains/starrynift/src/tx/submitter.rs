use super::{ConfirmationWaiter, TxOutcome, TxRequest, WaitOutcome};
use crate::chain::ChainRegistry;
use anyhow::{Context, Result};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::future::Future;
use tracing::{error, info};

/// Builds, signs and broadcasts transactions, then waits for them to settle.
///
/// Nothing here retries. Callers decide whether a failure is worth another
/// attempt.
pub struct TransactionSubmitter {
    chains: ChainRegistry,
    waiter: ConfirmationWaiter,
}

impl TransactionSubmitter {
    pub fn new(chains: ChainRegistry, waiter: ConfirmationWaiter) -> Self {
        Self { chains, waiter }
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    /// `label` prefixes every log line, e.g. `[3][0xabc..]`.
    pub async fn submit(&self, label: &str, signer: &LocalWallet, request: &TxRequest) -> TxOutcome {
        match self.try_submit(label, signer, request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} Error while sending tx | {:#}", label, e);
                TxOutcome::failed(format!("{:#}", e))
            }
        }
    }

    /// Like [`submit`](Self::submit), but failures before the broadcast
    /// (unknown chain, fee/gas/nonce reads, signing) come back as `Err`.
    /// Once the tx has been handed to the node every failure is a
    /// [`TxOutcome::Failed`], so retrying an `Err` never resubmits a tx.
    pub async fn try_submit(
        &self,
        label: &str,
        signer: &LocalWallet,
        request: &TxRequest,
    ) -> Result<TxOutcome> {
        let provider = self.chains.get(request.chain)?;

        let call: TypedTransaction = TransactionRequest::new()
            .from(request.from)
            .to(request.to)
            .data(request.data.clone())
            .into();

        // Independent reads; all must land before signing.
        let (gas_price, gas_limit, nonce) = tokio::try_join!(
            or_fetch(request.gas_price, "gas price", provider.gas_price()),
            or_fetch(request.gas_limit, "gas estimate", provider.estimate_gas(&call)),
            or_fetch(request.nonce, "nonce", provider.transaction_count(request.from)),
        )?;

        let tx: TypedTransaction = TransactionRequest::new()
            .from(request.from)
            .to(request.to)
            .data(request.data.clone())
            .gas_price(gas_price)
            .gas(gas_limit)
            .nonce(nonce)
            .chain_id(request.chain.id())
            .into();

        let signature = signer
            .sign_transaction_sync(&tx)
            .context("Failed to sign transaction")?;
        let raw = tx.rlp_signed(&signature);

        let tx_hash = match provider.send_raw_transaction(raw).await {
            Ok(hash) => hash,
            Err(e) => {
                error!("{} Broadcast on {} failed | {:#}", label, request.chain, e);
                return Ok(TxOutcome::failed(format!("broadcast failed: {:#}", e)));
            }
        };

        info!("{} Sent {:?} on {}, waiting for receipt", label, tx_hash, request.chain);

        let outcome = match self.waiter.wait(provider.as_ref(), tx_hash).await {
            Ok(WaitOutcome::Confirmed(hash)) => {
                info!("{} {:?} confirmed: Success", label, hash);
                TxOutcome::Confirmed { tx_hash: hash }
            }
            Ok(WaitOutcome::Failed) => {
                error!("{} {:?} transaction Failed on-chain", label, tx_hash);
                TxOutcome::failed(format!("transaction {:?} reverted", tx_hash))
            }
            Ok(WaitOutcome::TimedOut) => {
                error!(
                    "{} {:?} transaction Failed: not found after {}s",
                    label,
                    tx_hash,
                    self.waiter.max_wait.as_secs()
                );
                TxOutcome::failed(format!(
                    "transaction {:?} not found after {}s",
                    tx_hash,
                    self.waiter.max_wait.as_secs()
                ))
            }
            Err(e) => {
                error!("{} Polling {:?} failed | {:#}", label, tx_hash, e);
                TxOutcome::failed(format!("receipt polling failed: {:#}", e))
            }
        };

        Ok(outcome)
    }
}

async fn or_fetch<F>(hint: Option<U256>, what: &str, fetch: F) -> Result<U256>
where
    F: Future<Output = Result<U256>>,
{
    match hint {
        Some(value) => Ok(value),
        None => fetch
            .await
            .with_context(|| format!("Failed to resolve {}", what)),
    }
}
