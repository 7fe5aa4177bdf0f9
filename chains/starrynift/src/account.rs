use crate::config::StarryConfig;
use anyhow::{Context, Result};
use core_logic::config::ProxyConfig;
use core_logic::{KeyLoader, ProxyManager};
use ethers::prelude::*;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// One account's identity and remote session.
///
/// An `Account` is moved into exactly one lane and is only ever touched by
/// that lane, so the session fields are plain owned state with no locking.
/// It is intentionally not `Clone`: a copy would fork the session token and
/// user id, and a later login on one copy would silently not reach the other.
pub struct Account {
    id: usize,
    wallet: LocalWallet,
    proxy: Option<ProxyConfig>,
    user_agent: String,
    session_token: Option<String>,
    user_id: Option<String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("address", &self.address())
            .field("proxy", &self.proxy.as_ref().map(|p| p.url.as_str()))
            .field("user_agent", &self.user_agent)
            .field("logged_in", &self.session_token.is_some())
            .field("user_id", &self.user_id)
            .field("private_key", &"***REDACTED***")
            .finish()
    }
}

impl Account {
    pub fn new(
        id: usize,
        wallet: LocalWallet,
        proxy: Option<ProxyConfig>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            id,
            wallet,
            proxy,
            user_agent: user_agent.into(),
            session_token: None,
            user_id: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// EIP-55 checksummed address, the form the service expects.
    pub fn address_string(&self) -> String {
        ethers::utils::to_checksum(&self.address(), None)
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `[id][address]`, the prefix of every log line about this account.
    pub fn label(&self) -> String {
        format!("[{}][{}]", self.id, self.address_string())
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session_token.is_some()
    }

    pub fn set_session(&mut self, token: String, user_id: String) {
        self.session_token = Some(token);
        self.user_id = Some(user_id);
    }

    /// EIP-191 personal signature, hex encoded with a `0x` prefix.
    pub async fn sign_message(&self, message: &str) -> Result<String> {
        let signature = self
            .wallet
            .sign_message(message)
            .await
            .context("Failed to sign message")?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }
}

/// Builds the account pool from the key, proxy and user agent files.
pub struct AccountLoader;

impl AccountLoader {
    pub fn load(config: &StarryConfig) -> Result<Vec<Account>> {
        let keys = KeyLoader::load_from(&config.keys_file)?;
        let proxies = ProxyManager::load_from(&config.proxies_file)?;
        let user_agents = Self::load_user_agents(&config.user_agents_file)?;

        if !proxies.is_empty() && proxies.len() < keys.len() {
            warn!(
                "Only {} proxies for {} keys; the last {} keys will be skipped",
                proxies.len(),
                keys.len(),
                keys.len() - proxies.len()
            );
        }

        let mut accounts = Vec::with_capacity(keys.len());
        for (idx, key) in keys.iter().enumerate() {
            let proxy = if proxies.is_empty() {
                None
            } else {
                match proxies.get(idx) {
                    Some(p) => Some(p.clone()),
                    None => break,
                }
            };

            let wallet = key
                .as_str()
                .parse::<LocalWallet>()
                .with_context(|| format!("Failed to parse private key #{}", idx + 1))?;

            let user_agent = lookup_user_agent(&user_agents, wallet.address())
                .unwrap_or(config.default_user_agent.as_str())
                .to_string();

            accounts.push(Account::new(idx + 1, wallet, proxy, user_agent));
        }

        if config.shuffle_accounts {
            accounts.shuffle(&mut rand::thread_rng());
            info!("Shuffled {} accounts", accounts.len());
        }

        info!("Loaded {} accounts", accounts.len());
        Ok(accounts)
    }

    /// Address -> user agent map. A missing file means no overrides.
    fn load_user_agents(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let map: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(map
            .into_iter()
            .map(|(address, agent)| (address.to_lowercase(), agent))
            .collect())
    }
}

fn lookup_user_agent(agents: &HashMap<String, String>, address: Address) -> Option<&str> {
    agents
        .get(&format!("{:?}", address))
        .map(String::as_str)
}
