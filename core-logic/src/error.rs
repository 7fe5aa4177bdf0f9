//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// Wraps the specific error types so the application layer can match on a
/// single enum when it needs to, and fall back to `anyhow` when it doesn't.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Wallet(WalletError),

    #[error(transparent)]
    Network(NetworkError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<WalletError> for CoreError {
    fn from(e: WalletError) -> Self {
        CoreError::Wallet(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Private key loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid private key format on line {line}: expected hex string")]
    InvalidKeyFormat { line: usize },

    #[error("Private key on line {line} has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { line: usize, length: usize },
}

/// Network and API errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("HTTP error {status_code} from {endpoint}: {body}")]
    HttpError {
        status_code: u16,
        endpoint: String,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl NetworkError {
    /// The status codes the remote service uses for a successful call.
    pub fn is_success_status(status_code: u16) -> bool {
        matches!(status_code, 200 | 201)
    }
}
