mod common;

use common::{account, context, count, quest, ApiState, MockChain, MockFactory};
use core_logic::{DelayRange, GroupRunner};
use ethers::prelude::*;
use starrynift::account::Account;
use starrynift::config::StarryConfig;
use starrynift::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Duration;

fn accounts(n: usize) -> Vec<Account> {
    (1..=n).map(account).collect()
}

fn orchestrator(state: &Arc<ApiState>, config: StarryConfig) -> Arc<Orchestrator<MockFactory>> {
    let mut chain = MockChain::confirming();
    chain.claim_wait = U256::from(60u64);
    Arc::new(Orchestrator::new(
        context(config, Arc::new(chain)),
        MockFactory {
            state: Arc::clone(state),
        },
    ))
}

fn position(logins: &[String], account: &Account) -> usize {
    logins
        .iter()
        .position(|a| *a == account.address_string())
        .expect("account logged in")
}

#[tokio::test(start_paused = true)]
async fn test_five_accounts_in_two_lanes() {
    let state = Arc::new(ApiState {
        quests: vec![quest("Follow", true)],
        ..Default::default()
    });
    let config = StarryConfig {
        threads: 2,
        sleep: DelayRange::new(10, 30),
        ..Default::default()
    };
    let orchestrator = orchestrator(&state, config);
    let pool = accounts(5);
    let expected: Vec<Account> = accounts(5);

    let runner = orchestrator.runner();
    let summary = orchestrator.run(&runner, pool).await;

    assert_eq!(summary.groups, 2);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.failed_groups, 0);
    assert_eq!(count(&state.calls.quests), 5);

    let logins = state.logins();
    assert_eq!(logins.len(), 5);
    // Lane 0 holds accounts 1..=3, lane 1 holds 4..=5; order holds per lane.
    let lane0: Vec<usize> = expected[..3].iter().map(|a| position(&logins, a)).collect();
    let lane1: Vec<usize> = expected[3..].iter().map(|a| position(&logins, a)).collect();
    assert!(lane0.windows(2).all(|w| w[0] < w[1]));
    assert!(lane1.windows(2).all(|w| w[0] < w[1]));
    // The very first account starts without a pause.
    assert_eq!(logins[0], expected[0].address_string());
}

#[tokio::test(start_paused = true)]
async fn test_failed_account_does_not_stop_its_lane() {
    let failing = account(2).address_string();
    let state = Arc::new(ApiState {
        fail_login_for: [failing.clone()].into_iter().collect(),
        ..Default::default()
    });
    let config = StarryConfig {
        threads: 1,
        sleep: DelayRange::new(1, 2),
        ..Default::default()
    };
    let orchestrator = orchestrator(&state, config);

    let runner = orchestrator.runner();
    let summary = orchestrator.run(&runner, accounts(3)).await;

    assert_eq!(summary.processed, 3);
    assert_eq!(state.logins().len(), 2);
    assert!(!state.logins().contains(&failing));
    assert_eq!(count(&state.calls.is_minted), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run_starts_no_accounts() {
    let state = Arc::new(ApiState::default());
    let orchestrator = orchestrator(&state, StarryConfig::default());

    let runner = GroupRunner::new(2, DelayRange::zero());
    runner.cancellation_token().cancel();
    let summary = orchestrator.run(&runner, accounts(4)).await;

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 0);
    assert_eq!(count(&state.calls.login), 0);
}

#[tokio::test(start_paused = true)]
async fn test_lanes_run_concurrently() {
    let state = Arc::new(ApiState::default());
    let config = StarryConfig {
        threads: 4,
        sleep: DelayRange::new(20, 20),
        ..Default::default()
    };
    let orchestrator = orchestrator(&state, config);
    let started = tokio::time::Instant::now();

    let runner = orchestrator.runner();
    orchestrator.run(&runner, accounts(4)).await;

    // Lanes 1..=3 each sleep once, side by side.
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(state.logins().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stats_written_once_for_logged_in_accounts() {
    let failing = account(3).address_string();
    let state = Arc::new(ApiState {
        fail_login_for: [failing.clone()].into_iter().collect(),
        ..Default::default()
    });
    let orchestrator = orchestrator(&state, StarryConfig::default());
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("data").join("stats.json");

    let stats = orchestrator
        .collect_stats(accounts(3), &output)
        .await
        .unwrap();

    assert_eq!(stats.len(), 2);
    assert!(!stats.contains_key(&failing));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let entry = &written[account(1).address_string()];
    assert_eq!(entry["userId"], 100);
    assert_eq!(entry["level"], 3);
    assert_eq!(entry["xp"], 120);
    assert_eq!(entry["referralCode"], "REF");
    // Stats never touch the quest flow.
    assert_eq!(count(&state.calls.is_minted), 0);
}
