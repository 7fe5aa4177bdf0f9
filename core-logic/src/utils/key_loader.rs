use crate::error::{ConfigError, CoreError, WalletError};
use std::fs;
use std::path::Path;
use tracing::info;
use zeroize::Zeroizing;

/// Reads raw EVM private keys, one per line.
pub struct KeyLoader;

impl KeyLoader {
    pub const KEYS_FILE: &'static str = "private_keys.txt";

    /// Returns the keys in file order. Blank lines and `#` comments are
    /// skipped; every other line must be 32 bytes of hex, `0x` optional.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Vec<Zeroizing<String>>, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
            ConfigError::IoError {
                path: path.display().to_string(),
                msg: e.to_string(),
            }
        })?);

        let mut keys = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            keys.push(Self::validate(trimmed, idx + 1)?);
        }

        info!("Loaded {} private keys from {}", keys.len(), path.display());
        Ok(keys)
    }

    fn validate(raw: &str, line: usize) -> Result<Zeroizing<String>, WalletError> {
        let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
        if hex_part.len() != 64 {
            return Err(WalletError::InvalidKeyLength {
                line,
                length: hex_part.len(),
            });
        }
        let _decoded = Zeroizing::new(
            hex::decode(hex_part).map_err(|_| WalletError::InvalidKeyFormat { line })?,
        );
        Ok(Zeroizing::new(hex_part.to_string()))
    }
}
