#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::{DelayRange, RetryPolicy};
use ethers::abi::{self, Token};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use serde_json::json;
use starrynift::account::Account;
use starrynift::api::{
    ApiFactory, FollowTarget, QuestItem, RaffleStatus, StarryApi, UserProfile,
};
use starrynift::chain::{Chain, ChainProvider, ChainRegistry, ReceiptStatus};
use starrynift::config::StarryConfig;
use starrynift::workflow::WorkflowContext;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SIGNATURE_HEX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111111";

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

pub fn wallet(n: u64) -> LocalWallet {
    format!("{:064x}", n)
        .parse::<LocalWallet>()
        .expect("valid test key")
}

pub fn account(id: usize) -> Account {
    Account::new(id, wallet(id as u64), None, "TestAgent/1.0")
}

pub fn quest(name: &str, completed: bool) -> QuestItem {
    QuestItem {
        name: name.to_string(),
        completed,
    }
}

#[derive(Default)]
pub struct ApiCalls {
    pub challenge: AtomicUsize,
    pub login: AtomicUsize,
    pub current_user: AtomicUsize,
    pub user_info: AtomicUsize,
    pub is_minted: AtomicUsize,
    pub mint_signature: AtomicUsize,
    pub confirm_mint: AtomicUsize,
    pub confirm_daily: AtomicUsize,
    pub quests: AtomicUsize,
    pub follow: AtomicUsize,
    pub ping: AtomicUsize,
    pub raffle_status: AtomicUsize,
    pub confirm_raffle: AtomicUsize,
}

/// Scripted service state shared by every client a factory hands out.
pub struct ApiState {
    pub fail_login: bool,
    /// Checksummed addresses whose login is rejected.
    pub fail_login_for: HashSet<String>,
    pub minted: bool,
    pub quests: Vec<QuestItem>,
    pub users: HashMap<String, FollowTarget>,
    pub own_user_id: String,
    pub raffle: RaffleStatus,
    pub calls: ApiCalls,
    pub logins: Mutex<Vec<String>>,
    pub followed: Mutex<Vec<String>>,
}

impl Default for ApiState {
    fn default() -> Self {
        Self {
            fail_login: false,
            fail_login_for: HashSet::new(),
            minted: true,
            quests: Vec::new(),
            users: HashMap::new(),
            own_user_id: "100".to_string(),
            raffle: RaffleStatus {
                used: true,
                xp: U256::zero(),
                nonce: U256::zero(),
                signature: None,
            },
            calls: ApiCalls::default(),
            logins: Mutex::new(Vec::new()),
            followed: Mutex::new(Vec::new()),
        }
    }
}

impl ApiState {
    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }

    pub fn followed(&self) -> Vec<String> {
        self.followed.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub struct MockApi {
    pub state: Arc<ApiState>,
}

#[async_trait]
impl StarryApi for MockApi {
    async fn login_challenge(&self, address: &str) -> Result<String> {
        bump(&self.state.calls.challenge);
        Ok(format!("Sign in to StarryNift: {}", address))
    }

    async fn login(&self, address: &str, signature: &str, _referral_code: &str) -> Result<String> {
        bump(&self.state.calls.login);
        if self.state.fail_login || self.state.fail_login_for.contains(address) {
            return Err(anyhow!("login rejected"));
        }
        assert!(signature.starts_with("0x"));
        self.state.logins.lock().unwrap().push(address.to_string());
        Ok(format!("token-{}", address))
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile> {
        bump(&self.state.calls.current_user);
        assert!(token.starts_with("token-"));
        Ok(UserProfile {
            user_id: self.state.own_user_id.clone(),
            level: json!(3),
            xp: json!(120),
            referral_code: json!("REF"),
        })
    }

    async fn user_info(&self, _token: &str, user_id: &str) -> Result<FollowTarget> {
        bump(&self.state.calls.user_info);
        self.state
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown user {}", user_id))
    }

    async fn is_pass_minted(&self, _token: &str, _address: &str) -> Result<bool> {
        bump(&self.state.calls.is_minted);
        Ok(self.state.minted)
    }

    async fn mint_signature(&self, _token: &str) -> Result<String> {
        bump(&self.state.calls.mint_signature);
        Ok(SIGNATURE_HEX.to_string())
    }

    async fn confirm_mint(&self, _token: &str, _tx_hash: H256) -> Result<()> {
        bump(&self.state.calls.confirm_mint);
        Ok(())
    }

    async fn confirm_daily_claim(&self, _token: &str, _tx_hash: H256) -> Result<()> {
        bump(&self.state.calls.confirm_daily);
        Ok(())
    }

    async fn daily_quests(&self, _token: &str) -> Result<Vec<QuestItem>> {
        bump(&self.state.calls.quests);
        Ok(self.state.quests.clone())
    }

    async fn follow(&self, _token: &str, user_id: &str) -> Result<()> {
        bump(&self.state.calls.follow);
        self.state.followed.lock().unwrap().push(user_id.to_string());
        Ok(())
    }

    async fn ping_online(&self, _token: &str) -> Result<()> {
        bump(&self.state.calls.ping);
        Ok(())
    }

    async fn raffle_status(&self, _token: &str) -> Result<RaffleStatus> {
        bump(&self.state.calls.raffle_status);
        Ok(self.state.raffle.clone())
    }

    async fn confirm_raffle(&self, _token: &str, _tx_hash: H256) -> Result<()> {
        bump(&self.state.calls.confirm_raffle);
        Ok(())
    }
}

pub struct MockFactory {
    pub state: Arc<ApiState>,
}

impl ApiFactory for MockFactory {
    type Api = MockApi;

    fn build(&self, _account: &Account) -> Result<MockApi> {
        Ok(MockApi {
            state: Arc::clone(&self.state),
        })
    }
}

/// Scripted node. Receipt statuses are served in order, then `fallback`
/// forever.
pub struct MockChain {
    statuses: Mutex<VecDeque<ReceiptStatus>>,
    fallback: ReceiptStatus,
    pub claim_wait: U256,
    pub fail_broadcast: bool,
    pub fail_receipt: bool,
    /// Nonce reads that fail before the node starts answering.
    pub nonce_failures: AtomicUsize,
    pub receipt_polls: AtomicUsize,
    pub gas_price_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
    pub eth_calls: AtomicUsize,
    pub sent: Mutex<Vec<Bytes>>,
}

impl MockChain {
    pub fn with_statuses(statuses: Vec<ReceiptStatus>, fallback: ReceiptStatus) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            fallback,
            claim_wait: U256::zero(),
            fail_broadcast: false,
            fail_receipt: false,
            nonce_failures: AtomicUsize::new(0),
            receipt_polls: AtomicUsize::new(0),
            gas_price_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
            eth_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn confirming() -> Self {
        Self::with_statuses(Vec::new(), ReceiptStatus::Confirmed)
    }

    pub fn with_fallback(fallback: ReceiptStatus) -> Self {
        Self::with_statuses(Vec::new(), fallback)
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| ethers::utils::rlp::decode::<Transaction>(raw).expect("signed legacy tx"))
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainProvider for MockChain {
    async fn receipt_status(&self, _tx_hash: H256) -> Result<ReceiptStatus> {
        bump(&self.receipt_polls);
        if self.fail_receipt {
            return Err(anyhow!("rpc unavailable"));
        }
        let next = self.statuses.lock().unwrap().pop_front();
        Ok(next.unwrap_or(self.fallback))
    }

    async fn gas_price(&self) -> Result<U256> {
        bump(&self.gas_price_calls);
        Ok(U256::from(5_000_000_000u64))
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256> {
        bump(&self.estimate_calls);
        Ok(U256::from(50_000u64))
    }

    async fn transaction_count(&self, _address: Address) -> Result<U256> {
        bump(&self.nonce_calls);
        let failing = self
            .nonce_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("502 bad gateway"));
        }
        Ok(U256::from(7u64))
    }

    async fn chain_id(&self) -> Result<U256> {
        Ok(U256::from(Chain::Bsc.id()))
    }

    async fn call(&self, _tx: &TypedTransaction) -> Result<Bytes> {
        bump(&self.eth_calls);
        Ok(Bytes::from(abi::encode(&[Token::Uint(self.claim_wait)])))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        if self.fail_broadcast {
            return Err(anyhow!("insufficient funds for gas"));
        }
        let hash = H256::from(ethers::utils::keccak256(&raw));
        self.sent.lock().unwrap().push(raw);
        Ok(hash)
    }
}

pub fn registry(chain: Arc<MockChain>) -> ChainRegistry {
    ChainRegistry::new()
        .with_provider(Chain::Bsc, chain.clone())
        .with_provider(Chain::OpBnb, chain)
}

/// Two retries and no pauses between attempts.
pub fn context(config: StarryConfig, chain: Arc<MockChain>) -> Arc<WorkflowContext> {
    Arc::new(
        WorkflowContext::new(config, registry(chain))
            .with_retry_policy(RetryPolicy::new(2, DelayRange::zero()))
            .with_raffle_delay(DelayRange::zero()),
    )
}
