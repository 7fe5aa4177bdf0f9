//! # Core Logic - Shared Utilities for Multi-Account Runners
//!
//! This crate provides the chain-agnostic machinery used by the chain crates:
//! retrying remote calls, running accounts in concurrent lanes, logging, and
//! loading keys and proxies.
//!
//! ## Modules
//!
//! - [`config`] - Shared configuration value types
//! - [`error`] - Typed error handling with thiserror
//! - [`traits`] - Core trait definitions
//! - `utils` - Retry, group runner, logger, key and proxy loading

pub mod config;
pub mod error;
pub mod traits;
pub(crate) mod utils;

pub use config::{ChainConfig, DelayRange, ProxyConfig};
pub use error::{ConfigError, CoreError, NetworkError, WalletError};
pub use traits::LaneTask;

pub use utils::{
    partition_groups, setup_logger, with_retry, GroupRunner, KeyLoader,
    ProxyManager, RetryPolicy, RunSummary,
};
