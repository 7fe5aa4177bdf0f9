use starrynift::account::AccountLoader;
use starrynift::api::HttpApiFactory;
use starrynift::chain::ChainRegistry;
use starrynift::config::StarryConfig;
use starrynift::orchestrator::Orchestrator;
use starrynift::workflow::WorkflowContext;

use anyhow::Result;
use clap::{Parser, Subcommand};
use core_logic::setup_logger;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/starrynift/config.toml")]
    config: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Login, mint, daily check-in and quests for every account.
    Run,
    /// Collect userId, level, xp and referral code for every account.
    Stats {
        /// Overrides `stats_file` from the config.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep guard alive for file logging
    let _log_guard = setup_logger();
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);

    let config = match StarryConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Ok(());
        }
    };

    let accounts = AccountLoader::load(&config)?;
    if accounts.is_empty() {
        warn!("No accounts found in {}", config.keys_file);
        return Ok(());
    }

    let chains = ChainRegistry::connect(&config.chain_configs())?;
    let ctx = Arc::new(WorkflowContext::new(config.clone(), chains));
    let orchestrator = Arc::new(Orchestrator::new(ctx, HttpApiFactory::new(config.clone())));

    match args.command {
        Command::Run => {
            orchestrator.context().submitter.chains().verify().await?;
            let runner = orchestrator.runner().cancel_on_ctrl_c();
            let summary = orchestrator.run(&runner, accounts).await;
            if summary.cancelled {
                warn!("Run cancelled after {} accounts", summary.processed);
            }
        }
        Command::Stats { output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.stats_file));
            orchestrator.collect_stats(accounts, &output).await?;
        }
    }

    Ok(())
}
