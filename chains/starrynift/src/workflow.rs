//! Per-account state machine: login, pass mint, daily check-in, quests and
//! the optional raffle.
//!
//! Steps run in order and each is gated on the one before it. A failed login
//! or a failed mint ends the run for this account. Later steps log their
//! failures and let the workflow carry on.

use crate::account::Account;
use crate::api::{StarryApi, UserProfile};
use crate::chain::{Chain, ChainRegistry};
use crate::config::StarryConfig;
use crate::quests::{QuestKind, QuestReport};
use crate::tx::calldata;
use crate::tx::{ConfirmationWaiter, TransactionSubmitter, TxRequest};
use anyhow::{anyhow, Context, Result};
use core_logic::config::DelayRange;
use core_logic::{with_retry, RetryPolicy};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const BSC_GAS_PRICE_WEI: u64 = 2_000_000_000;
const MINT_GAS_LIMIT: u64 = 210_000;
const DAILY_GAS_LIMIT: u64 = 100_000;
const RAFFLE_GAS_PRICE_WEI: u64 = 20_000;
const RAFFLE_GAS_LIMIT: u64 = 100_000;

/// Shared, read-only state every workflow needs.
pub struct WorkflowContext {
    pub config: StarryConfig,
    pub retry: RetryPolicy,
    pub submitter: TransactionSubmitter,
    /// Pause before the raffle status is read.
    pub raffle_delay: DelayRange,
}

impl WorkflowContext {
    pub fn new(config: StarryConfig, chains: ChainRegistry) -> Self {
        let waiter = ConfirmationWaiter::default().with_max_wait(config.tx_max_wait());
        Self {
            retry: config.retry_policy(),
            submitter: TransactionSubmitter::new(chains, waiter),
            raffle_delay: DelayRange::new(3, 10),
            config,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_raffle_delay(mut self, delay: DelayRange) -> Self {
        self.raffle_delay = delay;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    /// Nothing to do this cycle.
    Skipped,
    Failed,
}

/// What happened to one account. `None` means the step was never reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub login: Option<StepStatus>,
    pub mint: Option<StepStatus>,
    pub daily_claim: Option<StepStatus>,
    pub quests: Option<StepStatus>,
    pub quest_report: QuestReport,
    pub raffle: Option<StepStatus>,
}

impl WorkflowOutcome {
    /// True when a hard prerequisite failed and the later steps were skipped.
    pub fn is_aborted(&self) -> bool {
        self.login == Some(StepStatus::Failed) || self.mint == Some(StepStatus::Failed)
    }
}

pub struct AccountWorkflow<A> {
    account: Account,
    api: A,
    ctx: Arc<WorkflowContext>,
}

impl<A: StarryApi> AccountWorkflow<A> {
    pub fn new(account: Account, api: A, ctx: Arc<WorkflowContext>) -> Self {
        Self { account, api, ctx }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn into_account(self) -> Account {
        self.account
    }

    pub async fn run(&mut self) -> WorkflowOutcome {
        let label = self.account.label();
        let mut outcome = WorkflowOutcome::default();

        if let Err(e) = self.login().await {
            error!("{} Login Failed | {:#}", label, e);
            outcome.login = Some(StepStatus::Failed);
            return outcome;
        }
        outcome.login = Some(StepStatus::Done);

        let mint = self.ensure_pass_minted().await;
        outcome.mint = Some(mint);
        if mint == StepStatus::Failed {
            return outcome;
        }

        outcome.daily_claim = Some(self.daily_claim().await);

        match self.complete_quests().await {
            Ok(report) => {
                outcome.quests = Some(if report.has_failures() {
                    StepStatus::Failed
                } else {
                    StepStatus::Done
                });
                outcome.quest_report = report;
            }
            Err(e) => {
                error!("{} Failed to get quests | {:#}", label, e);
                outcome.quests = Some(StepStatus::Failed);
            }
        }

        if self.ctx.config.raffle {
            outcome.raffle = Some(self.raffle().await);
        }

        outcome
    }

    /// Signs the login challenge and caches the session token and user id on
    /// the account.
    pub async fn login(&mut self) -> Result<()> {
        let label = self.account.label();
        info!("{} Logging in...", label);

        let address = self.account.address_string();
        let referral_code = self.ctx.config.referral_code();
        let (api, account, address) = (&self.api, &self.account, address.as_str());

        let token = with_retry(&self.ctx.retry, &format!("{} Login", label), || async move {
            let message = api.login_challenge(address).await?;
            let signature = account.sign_message(&message).await?;
            api.login(address, &signature, referral_code).await
        })
        .await?;

        let token_ref = token.as_str();
        let profile = with_retry(&self.ctx.retry, &format!("{} Get user info", label), || {
            api.current_user(token_ref)
        })
        .await?;

        debug!("{} Logged in as user {}", label, profile.user_id);
        self.account.set_session(token, profile.user_id);
        Ok(())
    }

    /// Re-reads the logged-in user's profile.
    pub async fn profile(&self) -> Result<UserProfile> {
        let token = self.session()?;
        let api = &self.api;
        with_retry(
            &self.ctx.retry,
            &format!("{} Get user info", self.account.label()),
            || api.current_user(token),
        )
        .await
    }

    fn session(&self) -> Result<&str> {
        self.account
            .session_token()
            .context("Account is not logged in")
    }

    async fn ensure_pass_minted(&self) -> StepStatus {
        let label = self.account.label();
        info!("{} Checking if pass has already been minted...", label);

        let minted = match self.is_pass_minted().await {
            Ok(minted) => minted,
            Err(e) => {
                error!("{} Failed to check pass | {:#}", label, e);
                return StepStatus::Failed;
            }
        };
        if minted {
            info!("{} Pass already minted", label);
            return StepStatus::Skipped;
        }

        info!("{} Minting pass...", label);
        match self.mint_pass().await {
            Ok(tx_hash) => {
                info!("{} Pass minted: Success {:?}", label, tx_hash);
                StepStatus::Done
            }
            Err(e) => {
                error!("{} Error while minting pass: Failed | {:#}", label, e);
                StepStatus::Failed
            }
        }
    }

    async fn is_pass_minted(&self) -> Result<bool> {
        let token = self.session()?;
        let address = self.account.address_string();
        let (api, address) = (&self.api, address.as_str());
        with_retry(
            &self.ctx.retry,
            &format!("{} Check pass", self.account.label()),
            || api.is_pass_minted(token, address),
        )
        .await
    }

    /// The mint transaction is broadcast at most once. Chain reads before the
    /// broadcast, the signature fetch and the confirmation are retried.
    async fn mint_pass(&self) -> Result<H256> {
        let label = self.account.label();
        let token = self.session()?;
        let api = &self.api;

        let signature_hex = with_retry(&self.ctx.retry, &format!("{} Mint signature", label), || {
            api.mint_signature(token)
        })
        .await?;
        let signature = calldata::decode_signature(&signature_hex)?;

        let owner = self.account.address();
        let request = TxRequest::new(
            Chain::Bsc,
            owner,
            calldata::contract_address(calldata::PASS_CONTRACT)?,
            calldata::mint_pass(owner, &signature),
        )
        .gas_price(U256::from(BSC_GAS_PRICE_WEI))
        .gas_limit(U256::from(MINT_GAS_LIMIT));

        let (submitter, wallet, label_ref, request) =
            (&self.ctx.submitter, self.account.wallet(), label.as_str(), &request);
        let tx_hash = with_retry(&self.ctx.retry, &format!("{} Mint tx", label), || {
            submitter.try_submit(label_ref, wallet, request)
        })
        .await?
        .into_result()?;

        with_retry(&self.ctx.retry, &format!("{} Confirm mint", label), || {
            api.confirm_mint(token, tx_hash)
        })
        .await?;

        Ok(tx_hash)
    }

    async fn daily_claim(&self) -> StepStatus {
        let label = self.account.label();
        info!("{} Checking in...", label);

        match self.try_daily_claim().await {
            Ok(status) => status,
            Err(e) => {
                error!("{} Failed daily check in | {:#}", label, e);
                StepStatus::Failed
            }
        }
    }

    async fn try_daily_claim(&self) -> Result<StepStatus> {
        let label = self.account.label();
        let token = self.session()?;

        let wait = self.time_until_next_claim().await?;
        if !wait.is_zero() {
            info!("{} Next claim in {}", label, format_wait(wait));
            return Ok(StepStatus::Skipped);
        }

        let owner = self.account.address();
        let request = TxRequest::new(
            Chain::Bsc,
            owner,
            calldata::contract_address(calldata::DAILY_CONTRACT)?,
            calldata::daily_sign_in(),
        )
        .gas_price(U256::from(BSC_GAS_PRICE_WEI))
        .gas_limit(U256::from(DAILY_GAS_LIMIT));

        let tx_hash = self.submit_with_retry("Daily tx", &request).await?;

        let api = &self.api;
        with_retry(&self.ctx.retry, &format!("{} Confirm daily", label), || {
            api.confirm_daily_claim(token, tx_hash)
        })
        .await?;

        info!("{} Daily check in: Success", label);
        Ok(StepStatus::Done)
    }

    /// Seconds until the check-in contract accepts the next claim.
    async fn time_until_next_claim(&self) -> Result<U256> {
        let provider = self.ctx.submitter.chains().get(Chain::Bsc)?;
        let call: TypedTransaction = TransactionRequest::new()
            .to(calldata::contract_address(calldata::DAILY_CONTRACT)?)
            .data(calldata::time_until_next_sign_in(self.account.address()))
            .into();
        let (provider, call) = (&provider, &call);

        with_retry(
            &self.ctx.retry,
            &format!("{} Claim time", self.account.label()),
            || async move {
                let output = provider.call(call).await?;
                calldata::decode_uint(&output)
            },
        )
        .await
    }

    /// Resubmits a fresh transaction while the outcome is a failure.
    async fn submit_with_retry(&self, what: &str, request: &TxRequest) -> Result<H256> {
        let label = self.account.label();
        let (submitter, wallet, label_ref) =
            (&self.ctx.submitter, self.account.wallet(), label.as_str());

        with_retry(&self.ctx.retry, &format!("{} {}", label, what), || async move {
            submitter
                .submit(label_ref, wallet, request)
                .await
                .into_result()
        })
        .await
    }

    async fn complete_quests(&self) -> Result<QuestReport> {
        let label = self.account.label();
        let token = self.session()?;
        let api = &self.api;

        let quests = with_retry(&self.ctx.retry, &format!("{} Get quests", label), || {
            api.daily_quests(token)
        })
        .await?;

        let mut report = QuestReport::default();
        for item in quests {
            if item.completed {
                info!("{} {} Quest Already Completed", label, item.name);
                report.already_completed += 1;
                continue;
            }

            info!("{} Completing quest: {}", label, item.name);
            let result = match QuestKind::from_name(&item.name) {
                QuestKind::Follow => self.follow_quest(token).await,
                QuestKind::Online => self.online_quest(token).await,
                QuestKind::Unknown(name) => {
                    warn!("{} Quest {} is not supported", label, name);
                    report.skipped += 1;
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    info!("{} {} Quest Completed: Success", label, item.name);
                    report.completed += 1;
                }
                Err(e) => {
                    error!("{} {} Quest Failed | {:#}", label, item.name, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Follows the first configured candidate that is neither this account
    /// nor already followed. Running out of candidates is a plain failure.
    async fn follow_quest(&self, token: &str) -> Result<()> {
        let label = self.account.label();
        let own_id = self.account.user_id().unwrap_or_default();
        let api = &self.api;

        let mut target = None;
        for candidate in &self.ctx.config.follow_candidates {
            let candidate = candidate.as_str();
            let info = with_retry(&self.ctx.retry, &format!("{} User info", label), || {
                api.user_info(token, candidate)
            })
            .await?;
            if info.user_id != own_id && !info.is_follow {
                target = Some(candidate);
                break;
            }
        }

        let target =
            target.ok_or_else(|| anyhow!("Already followed all users. Can't complete quest"))?;

        with_retry(&self.ctx.retry, &format!("{} Follow", label), || {
            api.follow(token, target)
        })
        .await?;
        debug!("{} Followed user {}", label, target);
        Ok(())
    }

    async fn online_quest(&self, token: &str) -> Result<()> {
        let label = self.account.label();
        let pings = self.ctx.config.online_pings;
        let interval = self.ctx.config.online_ping_interval();
        let api = &self.api;

        info!(
            "{} It would take about {} minutes...",
            label,
            online_quest_minutes(interval, pings)
        );

        for i in 1..=pings {
            with_retry(&self.ctx.retry, &format!("{} Ping", label), || {
                api.ping_online(token)
            })
            .await?;
            debug!("{} Ping {}/{}", label, i, pings);

            if i < pings {
                tokio::time::sleep(interval).await;
            }
        }
        Ok(())
    }

    async fn raffle(&self) -> StepStatus {
        let label = self.account.label();
        info!("{} Raffling...", label);

        match self.try_raffle().await {
            Ok(status) => status,
            Err(e) => {
                error!("{} Raffle Failed | {:#}", label, e);
                StepStatus::Failed
            }
        }
    }

    async fn try_raffle(&self) -> Result<StepStatus> {
        let label = self.account.label();
        let token = self.session()?;
        let api = &self.api;

        tokio::time::sleep(self.ctx.raffle_delay.sample()).await;

        let status = with_retry(&self.ctx.retry, &format!("{} Raffle status", label), || {
            api.raffle_status(token)
        })
        .await?;

        if status.used {
            info!("{} Already used free raffle today", label);
            return Ok(StepStatus::Skipped);
        }

        let Some(signature_hex) = status.signature.as_deref().filter(|s| !s.is_empty()) else {
            error!("{} Daily wasn't completed", label);
            return Ok(StepStatus::Skipped);
        };
        info!("{} Raffle xp: {}", label, status.xp);

        let signature = calldata::decode_signature(signature_hex)?;
        let owner = self.account.address();
        let request = TxRequest::new(
            Chain::OpBnb,
            owner,
            calldata::contract_address(calldata::RAFFLE_CONTRACT)?,
            calldata::raffle(owner, status.xp, status.nonce, &signature),
        )
        .gas_price(U256::from(RAFFLE_GAS_PRICE_WEI))
        .gas_limit(U256::from(RAFFLE_GAS_LIMIT));

        let tx_hash = self.submit_with_retry("Raffle tx", &request).await?;

        with_retry(&self.ctx.retry, &format!("{} Confirm raffle", label), || {
            api.confirm_raffle(token, tx_hash)
        })
        .await?;

        info!("{} Raffle: Success", label);
        Ok(StepStatus::Done)
    }
}

/// Rough length of the online quest, saturating instead of overflowing.
fn online_quest_minutes(interval: Duration, pings: u32) -> u64 {
    interval.as_secs().saturating_mul(u64::from(pings)) / 60
}

/// `H:MM:SS`, saturating at `u64::MAX` seconds.
fn format_wait(seconds: U256) -> String {
    let wait = if seconds > U256::from(u64::MAX) {
        u64::MAX
    } else {
        seconds.as_u64()
    };
    format!("{}:{:02}:{:02}", wait / 3600, (wait % 3600) / 60, wait % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(U256::from(0u64)), "0:00:00");
        assert_eq!(format_wait(U256::from(3_725u64)), "1:02:05");
        assert_eq!(format_wait(U256::from(86_399u64)), "23:59:59");
    }

    #[test]
    fn test_online_quest_minutes() {
        assert_eq!(online_quest_minutes(Duration::from_secs(30), 21), 10);
        assert_eq!(online_quest_minutes(Duration::from_secs(u64::MAX), 21), u64::MAX / 60);
    }

    #[test]
    fn test_outcome_aborted() {
        let mut outcome = WorkflowOutcome {
            login: Some(StepStatus::Done),
            mint: Some(StepStatus::Failed),
            ..Default::default()
        };
        assert!(outcome.is_aborted());

        outcome.mint = Some(StepStatus::Skipped);
        assert!(!outcome.is_aborted());
    }
}
