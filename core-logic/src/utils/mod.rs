//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod key_loader;
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;

// Selective exports - only public utilities
pub use key_loader::KeyLoader;
pub use logger::setup_logger;
pub use proxy_manager::ProxyManager;
pub use retry::{with_retry, RetryPolicy};
pub use runner::{partition_groups, GroupRunner, RunSummary};
