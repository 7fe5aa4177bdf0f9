use crate::account::Account;
use crate::api::{ApiFactory, UserProfile};
use crate::workflow::{AccountWorkflow, WorkflowContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{GroupRunner, LaneTask, RunSummary};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owns the shared context and runs every account through its workflow.
///
/// Accounts are fire-and-forget: each lane logs its own results and nothing
/// is aggregated across lanes.
pub struct Orchestrator<F> {
    ctx: Arc<WorkflowContext>,
    factory: F,
}

impl<F: ApiFactory> Orchestrator<F> {
    pub fn new(ctx: Arc<WorkflowContext>, factory: F) -> Self {
        Self { ctx, factory }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    /// A runner sized and paced from the loaded settings.
    pub fn runner(&self) -> GroupRunner {
        GroupRunner::new(self.ctx.config.group_count(), self.ctx.config.sleep)
    }

    pub async fn run(self: Arc<Self>, runner: &GroupRunner, accounts: Vec<Account>) -> RunSummary
    where
        F: 'static,
    {
        info!("Running StarryNift for {} accounts", accounts.len());
        runner.run(accounts, self).await
    }

    /// Logs every account in one after another and writes
    /// `{address: {userId, level, xp, referralCode}}` to `output` once at the
    /// end. Accounts that fail to log in are left out.
    pub async fn collect_stats(
        &self,
        accounts: Vec<Account>,
        output: &Path,
    ) -> Result<BTreeMap<String, UserProfile>> {
        let mut stats = BTreeMap::new();

        for account in accounts {
            let label = account.label();
            info!("{} Getting stats...", label);

            let api = match self.factory.build(&account) {
                Ok(api) => api,
                Err(e) => {
                    error!("{} Failed to build API client | {:#}", label, e);
                    continue;
                }
            };

            let mut workflow = AccountWorkflow::new(account, api, Arc::clone(&self.ctx));
            if let Err(e) = workflow.login().await {
                error!("{} Login Failed | {:#}", label, e);
                continue;
            }

            match workflow.profile().await {
                Ok(profile) => {
                    stats.insert(workflow.account().address_string(), profile);
                }
                Err(e) => error!("{} Failed to get stats | {:#}", label, e),
            }
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&stats)?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        info!("Stats saved to {}", output.display());
        Ok(stats)
    }
}

#[async_trait]
impl<F: ApiFactory> LaneTask<Account> for Orchestrator<F> {
    fn describe(&self, account: &Account) -> String {
        account.label()
    }

    async fn run(&self, account: Account) {
        let label = account.label();

        let api = match self.factory.build(&account) {
            Ok(api) => api,
            Err(e) => {
                error!("{} Failed to build API client | {:#}", label, e);
                return;
            }
        };

        let mut workflow = AccountWorkflow::new(account, api, Arc::clone(&self.ctx));
        let outcome = workflow.run().await;

        if outcome.is_aborted() {
            warn!("{} Workflow stopped early: {:?}", label, outcome);
        } else {
            info!(
                "{} Workflow finished | quests completed: {}, failed: {}",
                label, outcome.quest_report.completed, outcome.quest_report.failed
            );
        }
    }
}
