use crate::chain::{ChainProvider, ReceiptStatus};
use anyhow::Result;
use ethers::types::H256;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Confirmed(H256),
    /// Mined with a non-success status. Definitive.
    Failed,
    /// The node never saw the transaction within `max_wait`.
    TimedOut,
}

/// Polls a node until a submitted transaction is settled.
///
/// A receipt still waiting on its status is polled every `pending_interval`
/// with no upper bound. A transaction with no receipt is polled every
/// `not_found_interval` and given up on once `max_wait` has elapsed since the
/// wait started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationWaiter {
    pub pending_interval: Duration,
    pub not_found_interval: Duration,
    pub max_wait: Duration,
}

impl Default for ConfirmationWaiter {
    fn default() -> Self {
        Self {
            pending_interval: Duration::from_millis(300),
            not_found_interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(480),
        }
    }
}

impl ConfirmationWaiter {
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// RPC errors end the wait and are returned as-is.
    pub async fn wait(&self, provider: &dyn ChainProvider, tx_hash: H256) -> Result<WaitOutcome> {
        let started = Instant::now();
        loop {
            match provider.receipt_status(tx_hash).await? {
                ReceiptStatus::Confirmed => return Ok(WaitOutcome::Confirmed(tx_hash)),
                ReceiptStatus::Reverted => return Ok(WaitOutcome::Failed),
                ReceiptStatus::Pending => sleep(self.pending_interval).await,
                ReceiptStatus::NotFound => {
                    if started.elapsed() > self.max_wait {
                        return Ok(WaitOutcome::TimedOut);
                    }
                    debug!("{:?} not found yet, waiting", tx_hash);
                    sleep(self.not_found_interval).await;
                }
            }
        }
    }
}
