use anyhow::Result;
use config::{Config, Environment, File};
use core_logic::config::{ChainConfig, DelayRange};
use core_logic::{ConfigError, KeyLoader, ProxyManager, RetryPolicy};
use serde::Deserialize;
use std::time::Duration;

use crate::chain::Chain;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize, Clone)]
pub struct StarryConfig {
    #[serde(default = "default_bsc_rpc")]
    pub bsc_rpc: String,
    #[serde(default = "default_opbnb_rpc")]
    pub opbnb_rpc: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Either the bare code or a full invite link ending in `=<code>`.
    #[serde(default)]
    pub referral_code: String,
    /// User ids the follow quest may pick from, in preference order.
    #[serde(default)]
    pub follow_candidates: Vec<String>,
    /// Number of concurrent groups. Clamped by the runner.
    #[serde(default = "default_threads")]
    pub threads: i64,
    #[serde(default)]
    pub shuffle_accounts: bool,
    #[serde(default)]
    pub sleep: DelayRange,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_tx_max_wait_secs")]
    pub tx_max_wait_secs: u64,
    #[serde(default = "default_online_pings")]
    pub online_pings: u32,
    #[serde(default = "default_online_ping_interval_secs")]
    pub online_ping_interval_secs: u64,
    #[serde(default)]
    pub raffle: bool,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_user_agent")]
    pub default_user_agent: String,
    #[serde(default = "default_keys_file")]
    pub keys_file: String,
    #[serde(default = "default_proxies_file")]
    pub proxies_file: String,
    #[serde(default = "default_user_agents_file")]
    pub user_agents_file: String,
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
}

fn default_bsc_rpc() -> String {
    "https://bsc-dataseed.bnbchain.org".to_string()
}

fn default_opbnb_rpc() -> String {
    "https://opbnb-mainnet-rpc.bnbchain.org".to_string()
}

fn default_api_base_url() -> String {
    "https://api.starrynift.art/api-v2".to_string()
}

fn default_threads() -> i64 {
    1
}

fn default_retries() -> u32 {
    3
}

fn default_tx_max_wait_secs() -> u64 {
    480
}

fn default_online_pings() -> u32 {
    21
}

fn default_online_ping_interval_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_keys_file() -> String {
    KeyLoader::KEYS_FILE.to_string()
}

fn default_proxies_file() -> String {
    ProxyManager::PROXY_FILE.to_string()
}

fn default_user_agents_file() -> String {
    "user_agents.json".to_string()
}

fn default_stats_file() -> String {
    "stats.json".to_string()
}

impl Default for StarryConfig {
    fn default() -> Self {
        Self {
            bsc_rpc: default_bsc_rpc(),
            opbnb_rpc: default_opbnb_rpc(),
            api_base_url: default_api_base_url(),
            referral_code: String::new(),
            follow_candidates: Vec::new(),
            threads: default_threads(),
            shuffle_accounts: false,
            sleep: DelayRange::default(),
            retries: default_retries(),
            tx_max_wait_secs: default_tx_max_wait_secs(),
            online_pings: default_online_pings(),
            online_ping_interval_secs: default_online_ping_interval_secs(),
            raffle: false,
            accept_invalid_certs: false,
            default_user_agent: default_user_agent(),
            keys_file: default_keys_file(),
            proxies_file: default_proxies_file(),
            user_agents_file: default_user_agents_file(),
            stats_file: default_stats_file(),
        }
    }
}

impl StarryConfig {
    /// Reads `path` (TOML) and overlays `STARRY__*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("STARRY")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("follow_candidates")
                    .try_parsing(true),
            )
            .build()?;

        let config: StarryConfig = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!(e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, rpc) in [("bsc_rpc", &self.bsc_rpc), ("opbnb_rpc", &self.opbnb_rpc)] {
            if rpc.is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
            if url::Url::parse(rpc).is_err() {
                return Err(ConfigError::InvalidRpcUrl { url: rpc.clone() });
            }
        }

        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url".to_string(),
                reason: format!("'{}' is not a valid URL", self.api_base_url),
            });
        }

        if !self.sleep.is_valid() {
            return Err(ConfigError::InvalidValue {
                field: "sleep".to_string(),
                reason: format!(
                    "min_secs ({}) is greater than max_secs ({})",
                    self.sleep.min_secs, self.sleep.max_secs
                ),
            });
        }

        Ok(())
    }

    /// The bare referral code, whether configured as a code or a link.
    pub fn referral_code(&self) -> &str {
        match self.referral_code.rsplit_once('=') {
            Some((_, code)) => code,
            None => &self.referral_code,
        }
    }

    /// Group count as handed to the runner. Negative values become zero and
    /// are clamped up to one there.
    pub fn group_count(&self) -> usize {
        usize::try_from(self.threads).unwrap_or(0)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.sleep)
    }

    pub fn tx_max_wait(&self) -> Duration {
        Duration::from_secs(self.tx_max_wait_secs)
    }

    pub fn online_ping_interval(&self) -> Duration {
        Duration::from_secs(self.online_ping_interval_secs)
    }

    pub fn chain_configs(&self) -> Vec<ChainConfig> {
        vec![
            ChainConfig {
                name: Chain::Bsc.name().to_string(),
                rpc_endpoint: self.bsc_rpc.clone(),
                chain_id: Chain::Bsc.id(),
            },
            ChainConfig {
                name: Chain::OpBnb.name().to_string(),
                rpc_endpoint: self.opbnb_rpc.clone(),
                chain_id: Chain::OpBnb.id(),
            },
        ]
    }
}
