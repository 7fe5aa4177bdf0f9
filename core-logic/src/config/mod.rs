use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_endpoint: String,
    pub chain_id: u64,
}

/// Inclusive range of whole seconds to sleep between retries and between
/// accounts in a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 10,
            max_secs: 30,
        }
    }
}

impl DelayRange {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// No delay at all. Handy in tests.
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn is_valid(&self) -> bool {
        self.min_secs <= self.max_secs
    }

    /// Draws a delay uniformly from the range.
    pub fn sample(&self) -> Duration {
        let lo = self.min_secs.min(self.max_secs);
        let hi = self.min_secs.max(self.max_secs);
        Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
    }
}
